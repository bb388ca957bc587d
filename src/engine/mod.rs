pub mod checkpoint;
pub mod fanout;
pub mod lifecycle;
pub mod pricing;
pub mod resolver;
