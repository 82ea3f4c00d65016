pub mod magic_link;
pub mod password;
pub mod registration;
pub mod session;
pub mod social;
pub mod unlock;
