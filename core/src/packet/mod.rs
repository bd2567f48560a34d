pub mod types;
pub mod header;
pub mod body;
pub mod pkesk;
pub mod seipd;
pub mod literal;
pub mod message;

pub use types::*;
pub use header::*;
pub use body::*;
pub use pkesk::*;
pub use seipd::*;
pub use literal::*;
pub use message::*;
