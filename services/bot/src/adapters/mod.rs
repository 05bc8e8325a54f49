pub mod charts;
pub mod db;
pub mod mail;
pub mod telegram;

pub use charts::PlottersChartAdapter;
pub use db::DbAdapter;
pub use mail::SmtpMailAdapter;
pub use telegram::{ChatUpdate, TelegramAdapter};
