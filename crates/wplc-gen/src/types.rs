//! Type mapping from WPL types to LLVM IR types.

use inkwell::context::Context;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType};
use inkwell::AddressSpace;

use wplc_sem::WplType;
use wplc_tree::TypeSpec;

/// Maps WPL types onto LLVM types: BOOL is i1, INT is i32, STR is a
/// pointer, and an absent type (procedures, `Undefined`) is void.
pub struct TypeMapper<'ctx> {
    pub context: &'ctx Context,
}

impl<'ctx> TypeMapper<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self { context }
    }

    /// Map a source type annotation. Total: annotations are always one
    /// of the three concrete primitives.
    pub fn from_spec(&self, spec: TypeSpec) -> BasicTypeEnum<'ctx> {
        match spec {
            TypeSpec::Bool => self.context.bool_type().into(),
            TypeSpec::Int => self.context.i32_type().into(),
            TypeSpec::Str => self.context.ptr_type(AddressSpace::default()).into(),
        }
    }

    /// Map a symbol type. `None` means void (`Undefined`).
    pub fn basic(&self, ty: WplType) -> Option<BasicTypeEnum<'ctx>> {
        match ty {
            WplType::Bool => Some(self.context.bool_type().into()),
            WplType::Int => Some(self.context.i32_type().into()),
            WplType::Str => Some(self.context.ptr_type(AddressSpace::default()).into()),
            WplType::Undefined => None,
        }
    }

    /// Function type with the given return type, void when the return
    /// type maps to none.
    pub fn fn_type(
        &self,
        ret: WplType,
        params: &[BasicMetadataTypeEnum<'ctx>],
    ) -> FunctionType<'ctx> {
        match self.basic(ret) {
            Some(ty) => ty.fn_type(params, false),
            None => self.context.void_type().fn_type(params, false),
        }
    }
}
