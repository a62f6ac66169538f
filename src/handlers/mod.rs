// Route handlers, one module per resource group.
pub mod applications;
pub mod jobs;
pub mod listings;
pub mod probes;
pub mod session;

pub use applications::{apply as job_apply, my_applications};
pub use jobs::{
    create as job_create, delete as job_delete, get as job_get, list as job_list, list_by_owner as job_list_by_owner,
    update as job_update,
};
pub use listings::{blog_get, blogs, companies};
pub use probes::{health, root};
pub use session::{issue as session_issue, logout as session_logout};
