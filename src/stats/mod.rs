pub mod head_to_head;
pub mod kda;
pub mod normal;
pub mod records;

pub use head_to_head::{project, Projection};
pub use kda::{leaderboard, KdaEntry};
pub use records::{Record, Standings, TeamStanding};
