pub mod candle;
pub mod ticker;

pub use candle::{PricePoint, PricePointBuilder, PriceSeries};
pub use ticker::TickerVolume;
