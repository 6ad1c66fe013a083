use sea_orm::{ColumnTrait, ColumnType};

use crate::family::{TypeFamily, classify};

/// A declared field: column, storage type and resolved predicate family.
///
/// Created once while a [`PredicateSet`](crate::PredicateSet) is built and
/// never changed afterwards.
#[derive(Debug, Clone)]
pub struct FieldDeclaration<C> {
    name: String,
    column: C,
    storage: ColumnType,
    family: TypeFamily,
}

impl<C: ColumnTrait> FieldDeclaration<C> {
    /// Declare a field, classifying it from the column definition.
    #[must_use]
    pub fn new(column: C) -> Self {
        let storage = column.def().get_column_type().clone();
        let family = classify(&storage);
        Self::with_family(column, storage, family)
    }

    /// Declare a field with an explicit family, bypassing classification.
    #[must_use]
    pub fn with_family(column: C, storage: ColumnType, family: TypeFamily) -> Self {
        Self {
            name: column.as_str().to_owned(),
            column,
            storage,
            family,
        }
    }

    /// Field name, the column's snake_case identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column(&self) -> C {
        self.column
    }

    #[must_use]
    pub fn storage(&self) -> &ColumnType {
        &self.storage
    }

    #[must_use]
    pub fn family(&self) -> TypeFamily {
        self.family
    }
}
