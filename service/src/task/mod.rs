//! Background [`Task`]s definitions.

mod background;
pub mod resume_assignments;

pub use common::Handler as Task;

pub use self::{
    background::Background, resume_assignments::ResumeAssignments,
};
