use std::fmt;

use crate::metadata::token::Token;

/// Represents a parsed type in various signatures
///
/// Signatures are compared structurally: two instantiations of the same generic type
/// with equal argument lists compare equal and hash identically, which is what allows
/// signatures and type identities to be used as dispatch keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TypeSignature {
    #[default]
    /// Not defined
    Unknown,
    /// void
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// A pointer to a type
    Ptr(SignaturePointer),
    /// Type by reference
    ByRef(Box<TypeSignature>),
    /// CIL value-type
    // TypeDefOrRefOrSpecEncoded
    ValueType(Token),
    /// CIL Class
    // TypeDefOrRefOrSpecEncoded
    Class(Token),
    /// Generic type parameter (`!n`)
    GenericParamType(u32),
    /// Array
    Array(SignatureArray),
    /// Generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Type is referenced during runtime
    TypedByRef,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// System.Object
    Object,
    /// Single dimension array
    SzArray(SignatureSzArray),
    /// Generic method parameter (`!!n`)
    GenericParamMethod(u32),
    /// A pinned type
    Pinned(Box<TypeSignature>),
}

/// Size and lower bound of one array dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ArrayDimensions {
    /// The size of this dimension, if specified
    pub size: Option<u32>,
    /// The lower bound of this dimension, if specified
    pub lower_bound: Option<u32>,
}

/// A pointer to a 'flat' Array
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SignatureArray {
    /// The type in the array
    pub base: Box<TypeSignature>,
    /// The number of dimensions
    pub rank: u32,
    /// The dimensions (can be less than 'rank', are in order from 0..count)
    pub dimensions: Vec<ArrayDimensions>,
}

/// A single dimension, zero based array
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SignatureSzArray {
    /// Custom modifiers - `TypeDefOrRefOrSpecEncoded`
    pub modifiers: Vec<Token>,
    /// The type in the array
    pub base: Box<TypeSignature>,
}

/// A pointer to a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SignaturePointer {
    /// Custom modifiers - `TypeDefOrRefOrSpecEncoded`
    pub modifiers: Vec<Token>,
    /// The type pointed to
    pub base: Box<TypeSignature>,
}

/// Parameter with optional custom modifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SignatureParameter {
    /// Custom modifiers of the parameter - `TypeDefOrRefOrSpecEncoded`
    pub modifiers: Vec<Token>,
    /// Parameter is passed by reference
    pub by_ref: bool,
    /// The type of the parameter
    pub base: TypeSignature,
}

impl SignatureParameter {
    /// Create a plain parameter of the given type, without modifiers
    #[must_use]
    pub fn new(base: TypeSignature) -> Self {
        SignatureParameter {
            modifiers: Vec::new(),
            by_ref: false,
            base,
        }
    }
}

/// Represents a method signature (II.23.2.1)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SignatureMethod {
    /// Used to encode the keyword instance in the calling convention, see §II.15.3
    pub has_this: bool,
    /// Used to encode the keyword explicit in the calling convention, see §II.15.3
    pub explicit_this: bool,
    /// Used to encode the keyword default in the calling convention, see §II.15.3
    pub default: bool,
    /// Used to encode the keyword vararg in the calling convention, see §II.15.3
    pub vararg: bool,
    /// Used to indicate that the method has one or more generic parameters.
    pub param_count_generic: u32,
    /// The return type of this `Method`
    pub return_type: SignatureParameter,
    /// The parameters of this `Method`
    pub params: Vec<SignatureParameter>,
    /// The vararg parameters
    pub varargs: Vec<SignatureParameter>,
}

impl SignatureMethod {
    /// Create an instance (`hasthis`, default calling convention) method signature
    ///
    /// ## Arguments
    /// * '`return_type`' - The return type
    /// * 'params'        - The parameter types, in order
    #[must_use]
    pub fn instance(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        SignatureMethod {
            has_this: true,
            default: true,
            return_type: SignatureParameter::new(return_type),
            params: params.into_iter().map(SignatureParameter::new).collect(),
            ..Default::default()
        }
    }
}

impl TypeSignature {
    /// Returns the token of the type definition or reference this signature names directly
    ///
    /// `Class` and `ValueType` carry the token themselves, a `GenericInst` names its generic
    /// type definition. Every other shape returns `None`.
    #[must_use]
    pub fn type_token(&self) -> Option<Token> {
        match self {
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => Some(*token),
            TypeSignature::GenericInst(base, _) => base.type_token(),
            _ => None,
        }
    }

    /// Returns `true` if a generic type or method parameter appears anywhere in this signature
    #[must_use]
    pub fn has_generic_params(&self) -> bool {
        match self {
            TypeSignature::GenericParamType(_) | TypeSignature::GenericParamMethod(_) => true,
            TypeSignature::Ptr(ptr) => ptr.base.has_generic_params(),
            TypeSignature::ByRef(inner) | TypeSignature::Pinned(inner) => {
                inner.has_generic_params()
            }
            TypeSignature::Array(array) => array.base.has_generic_params(),
            TypeSignature::SzArray(array) => array.base.has_generic_params(),
            TypeSignature::GenericInst(base, args) => {
                base.has_generic_params() || args.iter().any(TypeSignature::has_generic_params)
            }
            TypeSignature::FnPtr(method) => {
                method.return_type.base.has_generic_params()
                    || method.params.iter().any(|p| p.base.has_generic_params())
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Unknown => write!(f, "<unknown>"),
            TypeSignature::Void => write!(f, "void"),
            TypeSignature::Boolean => write!(f, "bool"),
            TypeSignature::Char => write!(f, "char"),
            TypeSignature::I1 => write!(f, "int8"),
            TypeSignature::U1 => write!(f, "uint8"),
            TypeSignature::I2 => write!(f, "int16"),
            TypeSignature::U2 => write!(f, "uint16"),
            TypeSignature::I4 => write!(f, "int32"),
            TypeSignature::U4 => write!(f, "uint32"),
            TypeSignature::I8 => write!(f, "int64"),
            TypeSignature::U8 => write!(f, "uint64"),
            TypeSignature::R4 => write!(f, "float32"),
            TypeSignature::R8 => write!(f, "float64"),
            TypeSignature::String => write!(f, "string"),
            TypeSignature::Object => write!(f, "object"),
            TypeSignature::I => write!(f, "native int"),
            TypeSignature::U => write!(f, "native uint"),
            TypeSignature::TypedByRef => write!(f, "typedref"),
            TypeSignature::Ptr(ptr) => write!(f, "{}*", ptr.base),
            TypeSignature::ByRef(inner) => write!(f, "{}&", inner),
            TypeSignature::Pinned(inner) => write!(f, "{} pinned", inner),
            TypeSignature::ValueType(token) => write!(f, "valuetype {}", token),
            TypeSignature::Class(token) => write!(f, "class {}", token),
            TypeSignature::GenericParamType(index) => write!(f, "!{}", index),
            TypeSignature::GenericParamMethod(index) => write!(f, "!!{}", index),
            TypeSignature::SzArray(array) => write!(f, "{}[]", array.base),
            TypeSignature::Array(array) => {
                write!(f, "{}[", array.base)?;
                for _ in 1..array.rank {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
            TypeSignature::GenericInst(base, args) => {
                write!(f, "{}<", base)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            TypeSignature::FnPtr(method) => write!(f, "method {}", method),
        }
    }
}

impl fmt::Display for SignatureParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.by_ref {
            write!(f, "{}&", self.base)
        } else {
            write!(f, "{}", self.base)
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_this {
            write!(f, "instance ")?;
        }
        if self.vararg {
            write!(f, "vararg ")?;
        }
        write!(f, "{}", self.return_type)?;
        if self.param_count_generic > 0 {
            write!(f, "<{}>", self.param_count_generic)?;
        }
        write!(f, "(")?;
        for (i, param) in self.params.iter().chain(self.varargs.iter()).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}
