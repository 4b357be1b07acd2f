pub mod local_storage;
#[cfg(test)]
pub mod memory;
