pub mod desk;
pub mod documents;
pub mod ids;
pub mod listing;
