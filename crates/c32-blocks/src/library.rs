//! Function library contract and the factory that dispatches to libraries.

use crate::block::FunctionBlock;
use crate::error::{BlockError, BlockResult};

/// Id 0 is reserved for "no library" (circuits).
pub const NULL_LIBRARY_ID: u8 = 0;

/// A catalog of function kinds sharing one library id.
pub trait FunctionLibrary: Send {
    fn id(&self) -> u8;

    fn name(&self) -> &'static str;

    /// Function names indexed by function id.
    fn function_names(&self) -> &'static [&'static str];

    /// Build an instance. `inputs`/`outputs` are requested sizes for
    /// variable-arity functions and are ignored by fixed-arity ones.
    /// Returns `None` for unknown function ids.
    fn create(&self, function: u8, inputs: u8, outputs: u8) -> Option<FunctionBlock>;

    fn function_name(&self, function: u8) -> Option<&'static str> {
        self.function_names().get(function as usize).copied()
    }
}

/// Registry mapping library ids to libraries.
#[derive(Default)]
pub struct FunctionFactory {
    libraries: Vec<Box<dyn FunctionLibrary>>,
}

impl FunctionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, library: Box<dyn FunctionLibrary>) -> BlockResult<()> {
        let id = library.id();
        if id == NULL_LIBRARY_ID || self.library(id).is_some() {
            return Err(BlockError::LibraryId { id });
        }
        self.libraries.push(library);
        Ok(())
    }

    pub fn library(&self, id: u8) -> Option<&dyn FunctionLibrary> {
        self.libraries
            .iter()
            .find(|lib| lib.id() == id)
            .map(|lib| lib.as_ref())
    }

    pub fn libraries(&self) -> impl Iterator<Item = &dyn FunctionLibrary> + '_ {
        self.libraries.iter().map(|lib| lib.as_ref())
    }

    pub fn create_instance(
        &self,
        library: u8,
        function: u8,
        inputs: u8,
        outputs: u8,
    ) -> Option<FunctionBlock> {
        self.library(library)?.create(function, inputs, outputs)
    }
}

impl core::fmt::Debug for FunctionFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.libraries.iter().map(|lib| (lib.id(), lib.name())))
            .finish()
    }
}
