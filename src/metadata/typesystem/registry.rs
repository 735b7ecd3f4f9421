//! In-memory type universe for a closed set of modules.
//!
//! The [`TypeRegistry`] holds every type and method definition of the modules being
//! processed, plus the `TypeRef` and `MemberRef` rows that point at them. It is the concrete
//! [`TypeUniverse`] the vtable engine reads from when no other loader is plugged in.
//!
//! # Registry Architecture
//!
//! - **Token-based lookup**: Primary storage for types and methods, ordered by token (`SkipMap`)
//! - **Name-based lookup**: Secondary index from full name to type tokens (`DashMap`)
//! - **Reference redirection**: `TypeRef` -> `TypeDef` and `MemberRef` -> `MethodDef` maps
//!
//! References registered without a target model types and methods that live outside the
//! closed module set; resolving them fails with [`crate::Error::ResolutionError`].
//!
//! # Thread Safety
//!
//! Like the type registry of a metadata loader, all operations take `&self` and may be
//! called concurrently while the universe is being populated. Once populated, the registry
//! is treated as immutable by its readers.

use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    metadata::{
        method::MethodDefinitionRc,
        token::{Token, TABLE_MEMBERREF, TABLE_METHODDEF, TABLE_TYPEDEF, TABLE_TYPEREF},
        typesystem::{TypeDefinitionRc, TypeUniverse},
    },
    Error::{ResolutionError, TypeInsert},
    Result,
};

/// Central registry for all type and method definitions of a closed module set
///
/// # Examples
///
/// ```rust
/// use dotvtable::metadata::typesystem::{TypeBuilder, TypeRegistry, TypeUniverse};
///
/// let registry = TypeRegistry::new();
/// let object = TypeBuilder::class("System", "Object").build(&registry)?;
///
/// // A reference into the closed set resolves to its definition
/// let object_ref = registry.add_type_ref(Some(object.token));
/// assert_eq!(registry.resolve_type(object_ref)?.token, object.token);
///
/// // A reference leaving the closed set does not
/// let external = registry.add_type_ref(None);
/// assert!(registry.resolve_type(external).is_err());
/// # Ok::<(), dotvtable::Error>(())
/// ```
pub struct TypeRegistry {
    /// Primary type storage indexed by `TypeDef` token
    types: SkipMap<Token, TypeDefinitionRc>,
    /// Primary method storage indexed by `MethodDef` token
    methods: SkipMap<Token, MethodDefinitionRc>,
    /// `TypeRef` rows, with the `TypeDef` they resolve to (if inside the closed set)
    type_refs: DashMap<Token, Option<Token>>,
    /// `MemberRef` rows, with the `MethodDef` they resolve to (if inside the closed set)
    member_refs: DashMap<Token, Option<Token>>,
    /// Secondary index: types indexed by full name (namespace.name)
    types_by_fullname: DashMap<String, Vec<Token>>,
    /// Next free `TypeDef` row
    next_type_def: AtomicU32,
    /// Next free `MethodDef` row
    next_method_def: AtomicU32,
    /// Next free `TypeRef` row
    next_type_ref: AtomicU32,
    /// Next free `MemberRef` row
    next_member_ref: AtomicU32,
}

impl TypeRegistry {
    /// Create a new, empty registry
    #[must_use]
    pub fn new() -> Self {
        TypeRegistry {
            types: SkipMap::new(),
            methods: SkipMap::new(),
            type_refs: DashMap::new(),
            member_refs: DashMap::new(),
            types_by_fullname: DashMap::new(),
            next_type_def: AtomicU32::new(1),
            next_method_def: AtomicU32::new(1),
            next_type_ref: AtomicU32::new(1),
            next_member_ref: AtomicU32::new(1),
        }
    }

    /// Reserve the next free `TypeDef` token
    pub fn next_type_token(&self) -> Token {
        Token::from_parts(
            TABLE_TYPEDEF,
            self.next_type_def.fetch_add(1, Ordering::Relaxed),
        )
    }

    /// Reserve the next free `MethodDef` token
    pub fn next_method_token(&self) -> Token {
        Token::from_parts(
            TABLE_METHODDEF,
            self.next_method_def.fetch_add(1, Ordering::Relaxed),
        )
    }

    /// Insert a `TypeDefinition` into the registry
    ///
    /// ## Arguments
    /// * '`new_type`' - The type to register
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeInsert`] if the token is not a `TypeDef` token or is
    /// already registered.
    pub fn insert(&self, new_type: &TypeDefinitionRc) -> Result<()> {
        if !new_type.token.is_type_def() || self.types.contains_key(&new_type.token) {
            return Err(TypeInsert(new_type.token));
        }

        self.types.insert(new_type.token, new_type.clone());
        self.types_by_fullname
            .entry(new_type.fullname())
            .or_default()
            .push(new_type.token);
        Ok(())
    }

    /// Insert a `MethodDefinition` into the registry and attach it to its declaring type
    ///
    /// ## Arguments
    /// * '`new_method`' - The method to register
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeInsert`] if the token is not a `MethodDef` token or is
    /// already registered, and [`crate::Error::ResolutionError`] if the declaring type is
    /// not registered.
    pub fn insert_method(&self, new_method: &MethodDefinitionRc) -> Result<()> {
        if !new_method.token.is_method_def() || self.methods.contains_key(&new_method.token) {
            return Err(TypeInsert(new_method.token));
        }

        let owner = self
            .get(&new_method.declaring_type)
            .ok_or(ResolutionError(new_method.declaring_type))?;

        self.methods.insert(new_method.token, new_method.clone());
        owner.methods.push(new_method.token);
        Ok(())
    }

    /// Register a `TypeRef` row
    ///
    /// ## Arguments
    /// * 'target' - The `TypeDef` the reference resolves to, `None` if it leaves the closed set
    pub fn add_type_ref(&self, target: Option<Token>) -> Token {
        let token = Token::from_parts(
            TABLE_TYPEREF,
            self.next_type_ref.fetch_add(1, Ordering::Relaxed),
        );
        self.type_refs.insert(token, target);
        token
    }

    /// Register a `MemberRef` row pointing at a method
    ///
    /// ## Arguments
    /// * 'target' - The `MethodDef` the reference resolves to, `None` if it leaves the closed set
    pub fn add_member_ref(&self, target: Option<Token>) -> Token {
        let token = Token::from_parts(
            TABLE_MEMBERREF,
            self.next_member_ref.fetch_add(1, Ordering::Relaxed),
        );
        self.member_refs.insert(token, target);
        token
    }

    /// Look up a type by its `TypeDef` token
    pub fn get(&self, token: &Token) -> Option<TypeDefinitionRc> {
        self.types.get(token).map(|entry| entry.value().clone())
    }

    /// Look up a method by its `MethodDef` token
    pub fn get_method(&self, token: &Token) -> Option<MethodDefinitionRc> {
        self.methods.get(token).map(|entry| entry.value().clone())
    }

    /// Look up a type by its full name (Namespace.Name)
    ///
    /// If several types share the name, the first registered one is returned.
    pub fn get_by_fullname(&self, fullname: &str) -> Option<TypeDefinitionRc> {
        let tokens = self.types_by_fullname.get(fullname)?;
        tokens.first().and_then(|token| self.get(token))
    }

    /// Look up a method declared on `owner` by name
    ///
    /// If several methods share the name, the first declared one is returned.
    pub fn method_by_name(&self, owner: &Token, name: &str) -> Option<MethodDefinitionRc> {
        let owner = self.get(owner)?;
        owner
            .methods
            .iter()
            .filter_map(|(_, token)| self.get_method(token))
            .find(|method| method.name == name)
    }

    /// Returns the number of registered type definitions
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no type definitions are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns all registered type definitions, ordered by token
    pub fn all_types(&self) -> Vec<TypeDefinitionRc> {
        self.types.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeUniverse for TypeRegistry {
    fn resolve_type(&self, token: Token) -> Result<TypeDefinitionRc> {
        let definition = if token.is_type_ref() {
            self.type_refs
                .get(&token)
                .and_then(|target| *target.value())
                .ok_or(ResolutionError(token))?
        } else {
            token
        };

        self.get(&definition).ok_or(ResolutionError(token))
    }

    fn resolve_method(&self, token: Token) -> Result<MethodDefinitionRc> {
        let definition = if token.is_member_ref() {
            self.member_refs
                .get(&token)
                .and_then(|target| *target.value())
                .ok_or(ResolutionError(token))?
        } else {
            token
        };

        self.get_method(&definition).ok_or(ResolutionError(token))
    }
}
