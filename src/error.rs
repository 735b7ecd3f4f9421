use thiserror::Error;

use crate::metadata::token::Token;

/// Builds an [`Error::InvariantViolation`] carrying the source location it was raised from.
///
/// Invariant violations are logged at `error` level before they are returned, since they
/// indicate a bug in the construction engine or an upstream loader rather than bad input.
macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {{
        let message = $msg.to_string();
        log::error!("vtable invariant violated ({}:{}): {}", file!(), line!(), message);
        crate::Error::InvariantViolation {
            message,
            file: file!(),
            line: line!(),
        }
    }};

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {{
        let message = format!($fmt, $($arg)*);
        log::error!("vtable invariant violated ({}:{}): {}", file!(), line!(), message);
        crate::Error::InvariantViolation {
            message,
            file: file!(),
            line: line!(),
        }
    }};
}

pub(crate) use invariant_error;

/// The generic Error type, which covers every failure the vtable engine can report.
///
/// All failures are deterministic functions of the input type graph, none of them are
/// transient and nothing in this crate retries an operation after an error.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::ResolutionError`] - A referenced type or method is not part of the closed module set
/// - [`Error::CyclicTypeGraph`] - The inheritance / interface graph contains a cycle
/// - [`Error::RecursionLimit`] - The type graph nests deeper than the configured limit
///
/// ## Caller Errors
/// - [`Error::UnsupportedTypeShape`] - A vtable was requested for an array, pointer or similar shape
/// - [`Error::TypeInsert`] - A type or method was registered twice
///
/// ## Internal Errors
/// - [`Error::InvariantViolation`] - The engine reached a state that well-formed input never produces
///
/// # Examples
///
/// ```rust
/// use dotvtable::{Error, prelude::*};
/// use std::sync::Arc;
///
/// let registry = Arc::new(TypeRegistry::new());
/// let mut storage = VTableStorage::new(registry);
///
/// let array = TypeIdentity::from(TypeSignature::SzArray(SignatureSzArray {
///     modifiers: vec![],
///     base: Box::new(TypeSignature::I4),
/// }));
/// match storage.get_vtable(&array) {
///     Err(Error::UnsupportedTypeShape(shape)) => println!("no vtable for {}", shape),
///     other => panic!("unexpected result: {:?}", other.map(|_| ())),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced type or method could not be resolved within the closed module set.
    ///
    /// Raised when a base type, an interface or the target of an explicit override
    /// directive points at a token that the [`crate::metadata::typesystem::TypeUniverse`]
    /// cannot map onto a definition. This indicates a malformed input binary or a bug in
    /// the loader that populated the universe, and is fatal to processing the module.
    ///
    /// The associated [`Token`] identifies the reference that failed to resolve.
    #[error("Failed to resolve {0} within the loaded modules")]
    ResolutionError(Token),

    /// A vtable was requested for a type shape that has no dispatch table.
    ///
    /// Only type definitions, type references and generic instantiations of a type
    /// definition carry vtables; arrays, pointers, by-refs and generic parameters do not.
    /// The associated string renders the rejected shape.
    #[error("Unsupported type shape for vtable lookup - {0}")]
    UnsupportedTypeShape(String),

    /// The type graph contains a cycle.
    ///
    /// Well-formed binaries never contain inheritance or interface cycles, but malformed
    /// or adversarial inputs do. The associated [`Token`] is the type definition whose
    /// table was requested while it was still under construction.
    #[error("Cyclic type graph detected at {0}")]
    CyclicTypeGraph(Token),

    /// Recursion limit reached.
    ///
    /// Constructing a table recursively requests the tables of the base type and every
    /// interface. The nesting of these requests is bounded by
    /// [`crate::vtable::VTableConfig::max_depth`].
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// An internal invariant of the construction algorithm does not hold.
    ///
    /// For example, an explicit override directive targets a method that has no slot in
    /// the table under construction. Continuing would produce a silently wrong vtable,
    /// so construction stops instead.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Invariant violation - {file}:{line}: {message}")]
    InvariantViolation {
        /// The message to be printed for the violation
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Failed to insert a new entry into the `TypeRegistry`.
    ///
    /// The associated [`Token`] is already registered.
    #[error("Failed to insert new entry into TypeRegistry - {0}")]
    TypeInsert(Token),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
