//! Ahead-of-time x86-64 code generation for the byte program: a register
//! allocator virtualizing the VM's sixteen general-purpose registers onto a
//! physical pool, a small x86-64 instruction encoder, and a translator that
//! walks the shared opcode catalogue to lower a byte program into a native
//! function body.

mod allocator;
mod translator;
mod x86;

pub use allocator::{RegisterAllocator, MEMORY_BASE};
pub use translator::{CodegenError, Translator};
pub use x86::{Label, X86Encoder, X86Register};
