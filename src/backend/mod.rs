pub mod mips;
pub mod reg_alloc;
