pub mod conversations;
pub mod openai;
pub mod pagination;
pub mod responses;
pub mod sse;
