mod listed_token;
mod pool;
mod protocol_stat;
mod token;
mod token_price;

pub use listed_token::{ListedToken, ListedTokenPrice};
pub use pool::{Pool, PoolTokenRef};
pub use protocol_stat::{DailyVolume, ProtocolStat};
pub use token::{Token, UNRANKED};
pub use token_price::{DailyTokenPrice, TokenPrice, TokenPriceLatest};
