pub mod cache;
pub mod decoder;
pub mod disasm;
pub mod encoder;
pub mod exec;
pub mod instruction;
pub mod memory;
pub mod registers;
pub mod state;

pub use cache::{Cache, CacheBackup, ReplacePolicy};
pub use instruction::{Format, Instruction};
pub use memory::Memory;
pub use registers::{FRegisterFile, XRegisterFile};
pub use state::State;

// ---------- base opcodes ----------
pub const OPC_RTYPE: u32 = 0b011_0011;
pub const OPC_OPIMM: u32 = 0b001_0011;
pub const OPC_LOAD: u32 = 0b000_0011;
pub const OPC_STORE: u32 = 0b010_0011;
pub const OPC_BRANCH: u32 = 0b110_0011;
pub const OPC_JAL: u32 = 0b110_1111;
pub const OPC_JALR: u32 = 0b110_0111;
pub const OPC_LUI: u32 = 0b011_0111;
pub const OPC_AUIPC: u32 = 0b001_0111;
pub const OPC_SYSTEM: u32 = 0b111_0011;
pub const OPC_MISC_MEM: u32 = 0b000_1111;

// ---------- F extension opcodes ----------
pub const OPC_LOAD_FP: u32 = 0b000_0111;
pub const OPC_STORE_FP: u32 = 0b010_0111;
pub const OPC_OP_FP: u32 = 0b101_0011;
pub const OPC_FMADD: u32 = 0b100_0011;
pub const OPC_FMSUB: u32 = 0b100_0111;
pub const OPC_FNMSUB: u32 = 0b100_1011;
pub const OPC_FNMADD: u32 = 0b100_1111;

/// Dynamic rounding mode, the only one this simulator encodes.
pub const RM_DYN: u32 = 0b111;

/// Instruction word size in bytes.
pub const INST_LENGTH: u32 = 4;

// ---------- address-space layout ----------
pub const RESERVED_LOW_BEGIN: u32 = 0x0000_0000;
pub const RESERVED_LOW_END: u32 = 0x0000_ffff;
pub const TEXT_BEGIN: u32 = 0x0001_0000;
pub const TEXT_CEILING: u32 = 0x0fff_ffff;
pub const STATIC_BEGIN: u32 = 0x1000_0000;
pub const STATIC_CEILING: u32 = 0x7ffe_ffff;
pub const STACK_POINTER: u32 = 0x7fff_fff0;
pub const RESERVED_HIGH_BEGIN: u32 = 0xffff_0000;
pub const RESERVED_HIGH_END: u32 = 0xffff_ffff;
