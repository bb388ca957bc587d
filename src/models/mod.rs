pub mod artifact;
pub mod category;
pub mod courier;
pub mod offer;
pub mod order;
