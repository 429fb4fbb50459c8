//! Generic repository over any [`Entity`] and any [`Session`].
//!
//! Every operation takes the session explicitly. The repository never
//! begins, commits or rolls back; the caller decides the unit of work, so
//! several operations (for example clearing association rows and then
//! updating the owner) can share one transaction.

use std::marker::PhantomData;

use chrono::{SubsecRound, Utc};
use tracing::debug;

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_core::traits::{Entity, Field, Projection, Relation, RelationDef, Session, TableSchema};
use catalog_core::types::{
    Condition, OrderBy, PagedList, Paging, Predicate, Record, SelectQuery, Sort, SortDirection,
    Value,
};

/// Data access for entity kind `T`.
#[derive(Debug, Clone)]
pub struct Repository<T: Entity> {
    schema: TableSchema,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Default for Repository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Repository<T> {
    /// Create a repository for `T`.
    pub fn new() -> Self {
        Self {
            schema: TableSchema::of::<T>(),
            _marker: PhantomData,
        }
    }

    /// Table metadata of `T`.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Ascending order over the identity columns.
    fn identity_order() -> Vec<OrderBy> {
        T::key()
            .iter()
            .map(|f| OrderBy {
                column: f.column(),
                kind: f.kind(),
                direction: SortDirection::Asc,
            })
            .collect()
    }

    /// Lower `sort` and append the identity as a final tie-breaker.
    fn total_order(sort: &Sort<T::Field>) -> Vec<OrderBy> {
        let mut order = sort.lower();
        for field in T::key() {
            if !sort.contains(*field) {
                order.push(OrderBy {
                    column: field.column(),
                    kind: field.kind(),
                    direction: SortDirection::Asc,
                });
            }
        }
        order
    }

    fn projected_query<R: Projection<T>>(&self, filter: Condition) -> AppResult<SelectQuery> {
        let (columns, relations) = R::selection().lower()?;
        let mut query = SelectQuery::new(T::TABLE, columns).filter(filter);
        for fetch in relations {
            query = query.relation(fetch);
        }
        Ok(query)
    }

    /// Return the match with the lowest identity, projected as `R`.
    ///
    /// No match is `Ok(None)`.
    pub async fn find_one<R, S>(
        &self,
        session: &mut S,
        filter: &Predicate<T::Field>,
    ) -> AppResult<Option<R>>
    where
        R: Projection<T>,
        S: Session,
    {
        let query = self
            .projected_query::<R>(filter.lower()?)?
            .order(Self::identity_order())
            .paging(Paging::first(1));

        let row = session.fetch(&query).await?.into_iter().next();
        debug!(table = T::TABLE, found = row.is_some(), "find_one");
        row.map(R::from_row).transpose()
    }

    /// Like [`Repository::find_one`], but no match is a `NotFound` error.
    pub async fn get_one<R, S>(&self, session: &mut S, filter: &Predicate<T::Field>) -> AppResult<R>
    where
        R: Projection<T>,
        S: Session,
    {
        self.find_one(session, filter)
            .await?
            .ok_or_else(|| AppError::not_found(format!("{} not found", T::NAME)))
    }

    /// Count every match, then return the requested page of them.
    ///
    /// `total` ignores `paging`. The page is skipped entirely when it is
    /// certainly empty.
    pub async fn list_with_total<R, S>(
        &self,
        session: &mut S,
        filter: &Predicate<T::Field>,
        sort: &Sort<T::Field>,
        paging: Paging,
    ) -> AppResult<PagedList<R>>
    where
        R: Projection<T>,
        S: Session,
    {
        let condition = filter.lower()?;
        let total = session.count(&self.schema, &condition).await?;
        if paging.is_empty_for(total) {
            debug!(table = T::TABLE, total, "list_with_total: empty page");
            return Ok(PagedList::empty(total));
        }

        let query = self
            .projected_query::<R>(condition)?
            .order(Self::total_order(sort))
            .paging(paging);
        let rows = session.fetch(&query).await?;
        debug!(table = T::TABLE, total, page = rows.len(), "list_with_total");

        let data = rows
            .into_iter()
            .map(R::from_row)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PagedList::new(data, total))
    }

    /// Insert `entity` and every loaded child of its relations.
    ///
    /// The generated identity on the input is ignored and the creation
    /// timestamp is stamped here.
    pub async fn insert<S: Session>(&self, session: &mut S, entity: T) -> AppResult<T> {
        entity.check()?;

        let mut row = entity.to_record();
        if let Some(key) = T::generated_key() {
            row.remove(key.column());
        }
        if let Some(created) = T::created_at() {
            row.insert(created.column(), Utc::now().trunc_subsecs(6));
        }

        let stored = session.insert(&self.schema, row).await?;
        let mut out = T::from_record(stored.clone())?;

        for relation in T::Relation::all() {
            let Some(children) = entity.related(*relation) else {
                continue;
            };
            let def = relation.def();
            let child = (def.child)();
            let parent = stored.value(def.parent_key).clone();
            let children = attach(&child, def, &parent, children)?;

            let mut inserted = Vec::with_capacity(children.len());
            for row in children {
                inserted.push(session.insert(&child, row).await?);
            }
            out.set_related(*relation, inserted)?;
        }

        debug!(table = T::TABLE, "insert");
        Ok(out)
    }

    /// Load every match (locking it), apply `mutator` to each, and write
    /// back what changed.
    ///
    /// Relations listed in `includes` are loaded before the mutator runs and
    /// reconciled afterwards: rows the mutator removed are deleted, new rows
    /// are inserted, and rows with changed non-key columns are updated.
    /// A relation left as `None` is not touched.
    ///
    /// Returns the number of matched entities; zero matches is `Ok(0)`.
    pub async fn update_where<S, M>(
        &self,
        session: &mut S,
        filter: &Predicate<T::Field>,
        includes: &[T::Relation],
        mut mutator: M,
    ) -> AppResult<u64>
    where
        S: Session,
        M: FnMut(&mut T) + Send,
    {
        let query = SelectQuery::all_columns(&self.schema)
            .filter(filter.lower()?)
            .order(Self::identity_order())
            .for_update();
        let mut entities = session
            .fetch(&query)
            .await?
            .into_iter()
            .map(T::from_record)
            .collect::<AppResult<Vec<_>>>()?;

        if entities.is_empty() {
            debug!(table = T::TABLE, "update_where: no match");
            return Ok(0);
        }

        let mut included: Vec<T::Relation> = Vec::with_capacity(includes.len());
        for relation in includes {
            if !included.contains(relation) {
                included.push(*relation);
            }
        }
        for relation in &included {
            self.load_relation(session, *relation, &mut entities).await?;
        }

        let mut matched = 0_u64;
        for before in entities {
            let mut after = before.clone();
            mutator(&mut after);
            after.check()?;

            let old = before.to_record();
            let new = after.to_record();
            self.check_frozen(&old, &new)?;

            let changes: Record = new
                .iter()
                .filter(|(column, value)| old.value(column) != *value)
                .map(|(column, value)| (column.to_string(), value.clone()))
                .collect();
            if !changes.is_empty() {
                let target = Condition::key_of(&self.schema, &old)?;
                session.update(&self.schema, &target, &changes).await?;
            }

            for relation in T::Relation::all() {
                let replaced = after.related(*relation);
                if !included.contains(relation) {
                    if replaced.is_some() {
                        return Err(AppError::validation(format!(
                            "Relation '{}' of {} was replaced without being included",
                            relation.def().name,
                            T::NAME
                        )));
                    }
                    continue;
                }
                let Some(replaced) = replaced else {
                    continue;
                };
                let loaded = before.related(*relation).unwrap_or_default();
                let parent = old.value(relation.def().parent_key).clone();
                reconcile(session, relation.def(), &parent, loaded, replaced).await?;
            }
            matched += 1;
        }

        debug!(table = T::TABLE, matched, "update_where");
        Ok(matched)
    }

    /// Delete every match. Returns the number of removed entities.
    pub async fn delete_where<S: Session>(
        &self,
        session: &mut S,
        filter: &Predicate<T::Field>,
    ) -> AppResult<u64> {
        let removed = session.delete(&self.schema, &filter.lower()?).await?;
        debug!(table = T::TABLE, removed, "delete_where");
        Ok(removed)
    }

    /// Delete every match in one statement, typically association rows
    /// ahead of a full collection replacement.
    pub async fn delete_range_where<S: Session>(
        &self,
        session: &mut S,
        filter: &Predicate<T::Field>,
    ) -> AppResult<u64> {
        let removed = session.delete(&self.schema, &filter.lower()?).await?;
        debug!(table = T::TABLE, removed, "delete_range_where");
        Ok(removed)
    }

    /// Load one relation of every entity with a single query.
    async fn load_relation<S: Session>(
        &self,
        session: &mut S,
        relation: T::Relation,
        entities: &mut [T],
    ) -> AppResult<()> {
        let def = relation.def();
        let child = (def.child)();
        let parents: Vec<Value> = entities
            .iter()
            .map(|e| e.to_record().value(def.parent_key).clone())
            .filter(|v| !v.is_null())
            .collect();
        let kind = child.require_column(def.foreign_key)?.kind;

        let order = child
            .key
            .iter()
            .map(|k| {
                child.require_column(k).map(|c| OrderBy {
                    column: c.name,
                    kind: c.kind,
                    direction: SortDirection::Asc,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        let query = SelectQuery::all_columns(&child)
            .filter(Condition::In {
                column: def.foreign_key,
                kind,
                values: parents,
            })
            .order(order);
        let rows = session.fetch(&query).await?;
        debug!(relation = def.name, rows = rows.len(), "Loaded relation");

        for entity in entities.iter_mut() {
            let key = entity.to_record().value(def.parent_key).clone();
            let own = rows
                .iter()
                .filter(|r| r.value(def.foreign_key) == &key)
                .cloned()
                .collect();
            entity.set_related(relation, own)?;
        }
        Ok(())
    }

    /// Reject mutations of identity and creation timestamp.
    fn check_frozen(&self, old: &Record, new: &Record) -> AppResult<()> {
        for column in &self.schema.key {
            if old.value(column) != new.value(column) {
                return Err(AppError::validation(format!(
                    "Mutator changed identity column '{column}' of {}",
                    T::NAME
                )));
            }
        }
        if let Some(created) = T::created_at() {
            if old.value(created.column()) != new.value(created.column()) {
                return Err(AppError::validation(format!(
                    "Mutator changed creation timestamp of {}",
                    T::NAME
                )));
            }
        }
        Ok(())
    }
}

/// Point every child row at `parent`, keep only child columns, and reject
/// duplicate keys.
fn attach(
    child: &TableSchema,
    def: &RelationDef,
    parent: &Value,
    rows: Vec<Record>,
) -> AppResult<Vec<Record>> {
    let columns = child.column_names();
    let mut out: Vec<Record> = Vec::with_capacity(rows.len());
    for row in rows {
        let mut row = row.project(&columns);
        row.insert(def.foreign_key, parent.clone());
        if let Some(generated) = child.generated_key {
            row.remove(generated);
        }
        if !child.key.is_empty() && out.iter().any(|o| same_key(child, o, &row)) {
            return Err(AppError::integrity(format!(
                "Duplicate rows in relation '{}'",
                def.name
            )));
        }
        out.push(row);
    }
    Ok(out)
}

fn same_key(schema: &TableSchema, a: &Record, b: &Record) -> bool {
    schema.key.iter().all(|k| a.value(k) == b.value(k))
}

/// Bring the stored rows of one relation in line with `replaced`.
async fn reconcile<S: Session>(
    session: &mut S,
    def: &RelationDef,
    parent: &Value,
    loaded: Vec<Record>,
    replaced: Vec<Record>,
) -> AppResult<()> {
    let child = (def.child)();
    let replaced = attach(&child, def, parent, replaced)?;

    let mut removed = 0_usize;
    for old in &loaded {
        if !replaced.iter().any(|r| same_key(&child, r, old)) {
            session
                .delete(&child, &Condition::key_of(&child, old)?)
                .await?;
            removed += 1;
        }
    }

    let mut added = 0_usize;
    for row in replaced {
        match loaded.iter().find(|old| same_key(&child, old, &row)) {
            None => {
                session.insert(&child, row).await?;
                added += 1;
            }
            Some(old) => {
                let changes: Record = row
                    .iter()
                    .filter(|(column, value)| !child.is_key(column) && old.value(column) != *value)
                    .map(|(column, value)| (column.to_string(), value.clone()))
                    .collect();
                if !changes.is_empty() {
                    session
                        .update(&child, &Condition::key_of(&child, old)?, &changes)
                        .await?;
                }
            }
        }
    }

    debug!(relation = def.name, added, removed, "Reconciled relation");
    Ok(())
}
