use std::{fs::File, io::Write};

use anyhow::Result;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use serde::{Deserialize, Serialize};

fn main() -> Result<()> {
    // Regenerate if `opcodes.json` changes
    println!("cargo:rerun-if-changed=opcodes.json");

    let opcode_json: Vec<Opcode> = serde_json::from_slice(include_bytes!("./opcodes.json"))?;

    assert_eq!(256, opcode_json.len(), "Must have exactly 256 opcodes");
    for (index, op) in opcode_json.iter().enumerate() {
        assert_eq!(
            index as u8, op.opcode,
            "opcodes.json must be ordered and dense 0..=255"
        );
    }

    let syn_file = build_opcodes_file(&opcode_json)?;
    let mut file = File::create("./src/opcodes.rs")?;

    write!(file, "{}", prettyplease::unparse(&syn_file))?;

    Ok(())
}

fn build_opcodes_file(opcodes: &[Opcode]) -> Result<syn::File> {
    Ok(syn::File {
        shebang: None,
        attrs: vec![],
        items: vec![
            syn::parse2(build_enum(opcodes))?,
            syn::parse2(build_from(opcodes))?,
            syn::parse2(build_display(opcodes))?,
            syn::parse2(build_shape_enum())?,
            syn::parse2(build_info_struct())?,
            syn::parse2(build_catalogue(opcodes))?,
            syn::parse2(build_opcode_impl(opcodes))?,
            syn::parse2(build_from_mnemonic(opcodes))?,
        ],
    })
}

fn build_enum(opcodes: &[Opcode]) -> TokenStream {
    let opcodes = opcodes.iter().map(|op| {
        let id = format_ident!("{}", op.id);
        let opcode = op.opcode;

        quote! { #id = #opcode }
    });

    quote! {
        /// The shared opcode catalogue. The assembler and the emulator dispatch
        /// off this same enum so the two can never silently drift apart.
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            #(#opcodes),*
        }
    }
}

fn build_from(opcodes: &[Opcode]) -> TokenStream {
    let opcodes = opcodes.iter().map(|op| {
        let id = format_ident!("{}", op.id);
        let opcode = op.opcode;

        quote! { #opcode => Self::#id }
    });

    quote! {
        impl From<u8> for Opcode {
            fn from(opcode: u8) -> Self {
                match opcode {
                    #(#opcodes,)*
                    _ => unreachable!("opcodes.json covers every u8 value"),
                }
            }
        }
    }
}

fn build_display(opcodes: &[Opcode]) -> TokenStream {
    let opcodes = opcodes.iter().map(|op| {
        let id = format_ident!("{}", op.id);
        let mnemonic = op.mnemonic.first().unwrap();

        quote! { Self::#id => #mnemonic }
    });

    quote! {
        impl std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", match self {
                    #(#opcodes),*
                })
            }
        }
    }
}

fn build_shape_enum() -> TokenStream {
    quote! {
        /// The operand payload shape following the opcode byte.
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
        pub enum OperandShape {
            /// No operands: just the opcode byte.
            Nullary,
            /// A single register index byte.
            Register,
            /// A single 8-bit address byte.
            Address,
            /// Two register index bytes.
            RegReg,
            /// A register index byte and an 8-bit immediate.
            RegImm8,
            /// A register index byte and an 8-bit address.
            RegAddress,
            /// A register index byte and an 8-bit port number.
            RegPort,
            /// A register index byte and a little-endian 64-bit immediate.
            RegImm64,
            /// An address byte, a length byte, and `length` payload bytes.
            DefineBytes,
        }
    }
}

fn build_info_struct() -> TokenStream {
    quote! {
        /// One row of the opcode catalogue: everything the assembler and the
        /// emulator need to know about an opcode byte.
        #[derive(Clone, Copy, Debug)]
        pub struct OpcodeInfo {
            pub opcode: u8,
            pub mnemonic: &'static str,
            pub shape: OperandShape,
            /// Encoded size in bytes, fixed for every shape except `DefineBytes`,
            /// whose size depends on the length byte in the instruction stream.
            pub size: Option<usize>,
            /// True for opcode bytes the catalogue allocates no mnemonic to.
            /// Dispatching one of these is an `InvalidOpcode` fault.
            pub reserved: bool,
        }
    }
}

fn build_catalogue(opcodes: &[Opcode]) -> TokenStream {
    let rows = opcodes.iter().map(|op| {
        let opcode = op.opcode;
        let mnemonic = op.mnemonic.first().unwrap();
        let shape = format_ident!("{}", op.shape);
        let size = match op.size {
            Some(n) => quote! { Some(#n) },
            None => quote! { None },
        };
        let reserved = op.reserved;

        quote! {
            OpcodeInfo {
                opcode: #opcode,
                mnemonic: #mnemonic,
                shape: OperandShape::#shape,
                size: #size,
                reserved: #reserved,
            }
        }
    });

    quote! {
        /// The authoritative opcode table, indexed by opcode byte.
        pub const CATALOGUE: [OpcodeInfo; 256] = [
            #(#rows),*
        ];
    }
}

fn build_opcode_impl(opcodes: &[Opcode]) -> TokenStream {
    let shape_arms = opcodes.iter().map(|op| {
        let id = format_ident!("{}", op.id);
        quote! { Self::#id => CATALOGUE[#id as usize].shape }
    });
    let size_arms = opcodes.iter().map(|op| {
        let id = format_ident!("{}", op.id);
        quote! { Self::#id => CATALOGUE[#id as usize].size }
    });
    let reserved_arms = opcodes.iter().map(|op| {
        let id = format_ident!("{}", op.id);
        quote! { Self::#id => CATALOGUE[#id as usize].reserved }
    });

    quote! {
        impl Opcode {
            /// The operand shape this opcode expects.
            pub fn shape(self) -> OperandShape {
                match self {
                    #(#shape_arms),*
                }
            }

            /// The fixed encoded size in bytes, or `None` for variable-length
            /// shapes (`DefineBytes`).
            pub fn encoded_size(self) -> Option<usize> {
                match self {
                    #(#size_arms),*
                }
            }

            /// True if this opcode byte has no allocated mnemonic.
            pub fn is_reserved(self) -> bool {
                match self {
                    #(#reserved_arms),*
                }
            }
        }
    }
}

fn build_from_mnemonic(opcodes: &[Opcode]) -> TokenStream {
    let arms = opcodes
        .iter()
        .filter(|op| !op.reserved)
        .map(|op| {
            let id = format_ident!("{}", op.id);
            let mnemonic = op.mnemonic.first().unwrap();

            quote! { #mnemonic => Some(Self::#id) }
        });

    quote! {
        impl Opcode {
            /// Resolve a source mnemonic (case-insensitive) to its opcode.
            /// Returns `None` for unknown mnemonics and for the reserved bytes
            /// that have no assembly-language spelling.
            pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
                match mnemonic.to_ascii_uppercase().as_str() {
                    #(#arms,)*
                    _ => None,
                }
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
struct Opcode {
    opcode: u8,
    id: String,
    mnemonic: Vec<String>,
    shape: String,
    size: Option<usize>,
    #[serde(default)]
    reserved: bool,
}
