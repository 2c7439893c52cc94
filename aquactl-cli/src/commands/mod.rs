pub mod enforcers;
pub mod images;
pub mod licenses;
pub mod profile;
pub mod repos;
pub mod setup;
pub mod vms;
