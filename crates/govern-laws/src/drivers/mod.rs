//! One module per law variant, each implementing `crate::model::Resource`
//! for its struct. Registered here purely for compilation — dispatch
//! itself lives in `model::Law`'s `Resource` impl.

mod container;
mod file_change;
mod file_insert;
mod file_link;
mod file_template;
mod group;
mod mount;
mod package;
mod package_repo;
mod script;
mod service;
mod ssh_key;
mod user;
