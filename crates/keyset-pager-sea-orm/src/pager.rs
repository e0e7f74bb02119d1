//! A small fluent builder over [`SeaOrmQuery`] and
//! [`SeaOrmPredicateBuilder`], mirroring the corpus's own paginator
//! builder shape but without its tenant-scoping/connection-lifecycle
//! layer: this crate takes a plain `sea_orm::Select<E>` and a plain
//! `ConnectionTrait` connection directly, since both are out of scope
//! here (§1).

use sea_orm::{ConnectionTrait, EntityTrait, Select};

use keyset_pager::ordering::OrderingSpec;
use keyset_pager::{self, PageOptions, Paginated};

use crate::backend::{SeaOrmPredicateBuilder, SeaOrmQuery};
use crate::error::Result;
use crate::field::FieldMap;

/// Builds a single `paginate` call against a `sea_orm` entity.
///
/// Safety ceilings (`keyset_pager::Limits`) are not this type's concern:
/// apply them to the raw filter/order-by strings before parsing, ahead of
/// ever reaching a `SeaOrmPager`.
pub struct SeaOrmPager<'a, E: EntityTrait, C: ConnectionTrait> {
    select: Select<E>,
    fields: &'a FieldMap<E>,
    ordering: Option<OrderingSpec>,
    conn: &'a C,
}

impl<'a, E: EntityTrait, C: ConnectionTrait> SeaOrmPager<'a, E, C> {
    #[must_use]
    pub fn new(select: Select<E>, fields: &'a FieldMap<E>, conn: &'a C) -> Self {
        Self {
            select,
            fields,
            ordering: None,
            conn,
        }
    }

    /// Sets the ordering to apply. Must be called before [`Self::paginate`];
    /// this is the ordering the caller already parsed and validated via
    /// `keyset_pager::ordering::parse` against this entity's safelist.
    #[must_use]
    pub fn order(mut self, ordering: OrderingSpec) -> Self {
        self.ordering = Some(ordering);
        self
    }

    /// Appends `field` as a final ascending tiebreaker unless it is
    /// already present in the ordering, guaranteeing a deterministic total
    /// order (§3).
    #[must_use]
    pub fn tiebreaker(mut self, field: &str) -> Self {
        if let Some(ordering) = &mut self.ordering {
            ordering.ensure_tiebreaker(field);
        }
        self
    }

    /// Runs the paginate call: counts the base (filtered) query, applies
    /// the cursor's seek predicate if present, fetches `size + 1` rows,
    /// and returns the assembled page.
    ///
    /// # Errors
    /// Returns an error if no ordering was set, if `options`'s cursor
    /// mismatches the ordering, or if the underlying database calls fail.
    pub async fn paginate(self, options: &PageOptions) -> Result<Paginated<E::Model>> {
        let ordering = self.ordering.unwrap_or_else(|| OrderingSpec(Vec::new()));
        let query = SeaOrmQuery::new(self.select, self.fields, ordering, self.conn);
        let builder = SeaOrmPredicateBuilder { fields: self.fields };
        Ok(keyset_pager::paginate(&query, &builder, options).await?)
    }
}
