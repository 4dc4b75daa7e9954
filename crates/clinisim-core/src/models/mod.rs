pub mod case;
pub mod investigation;
pub mod score;
pub mod session;
pub mod turn;
