pub mod finance;
pub mod incentive;
pub mod partner;
pub mod product;
pub mod quote;
