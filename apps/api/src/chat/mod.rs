// Document-grounded free-text chat. Stateless: the client carries the history.

pub mod conversation;
pub mod handlers;
pub mod prompts;
