pub mod cost;
pub mod inspect;
pub mod plan;
pub mod roundtrip;
