pub mod aggregate;
pub mod change_info;
pub mod discover;
pub mod format_a;
pub mod format_b;
pub mod normalize;
pub mod similarity;
pub mod source;
