pub mod change_info;
pub mod feature;
pub mod record;
pub mod report;
pub mod stats;
