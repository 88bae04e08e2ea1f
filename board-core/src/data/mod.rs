pub mod backend;
#[cfg(test)]
pub mod in_memory;
pub mod storage;
