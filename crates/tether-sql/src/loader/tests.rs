use super::*;
use crate::{error::ScanError, executor::Dialect, row::Row};
use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};
use tether_core::{
    error::{ErrorClass, LinkError},
    obs::{metrics_report, metrics_reset_all},
    relation::{BelongsTo, HasMany, MissingParentPolicy},
};

///
/// Fixtures
///

#[derive(Debug)]
struct Author {
    id: String,
    name: String,
    posts: HasMany<Rc<Post>>,
}

impl Identifiable for Author {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl Scan for Author {
    const COLUMNS: &'static [&'static str] = &["id", "name"];

    fn scan(row: &Row) -> Result<Self, ScanError> {
        row.expect_arity(Self::COLUMNS.len())?;

        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            posts: HasMany::new(),
        })
    }
}

#[derive(Debug)]
struct Post {
    id: u32,
    author_id: String,
    author: BelongsTo<Rc<Author>>,
}

impl Identifiable for Post {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

impl Scan for Post {
    const COLUMNS: &'static [&'static str] = &["id", "author_id", "title"];

    fn scan(row: &Row) -> Result<Self, ScanError> {
        row.expect_arity(Self::COLUMNS.len())?;

        Ok(Self {
            id: row.get(0)?,
            author_id: row.get(1)?,
            author: BelongsTo::new(),
        })
    }
}

fn post(id: u32, author_id: &str) -> Rc<Post> {
    Rc::new(Post {
        id,
        author_id: author_id.to_string(),
        author: BelongsTo::new(),
    })
}

fn author(id: &str) -> Rc<Author> {
    Rc::new(Author {
        id: id.to_string(),
        name: format!("author {id}"),
        posts: HasMany::new(),
    })
}

fn author_row(id: &str) -> Row {
    Row::new(vec![id.into(), format!("author {id}").into()])
}

fn post_row(id: u32, author_id: &str) -> Row {
    Row::new(vec![id.into(), author_id.into(), format!("post {id}").into()])
}

///
/// FakeDb
///
/// In-memory executor. Tables are picked by `FROM <name>`; rows are kept
/// when the column named before `IN (` holds one of the bound arguments.
///

#[derive(Debug, PartialEq)]
struct FakeError(&'static str);

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for FakeError {}

struct Table {
    columns: &'static [&'static str],
    rows: Vec<Row>,
}

struct FakeDb {
    dialect: Dialect,
    tables: HashMap<&'static str, Table>,
    failure: Option<&'static str>,
    calls: RefCell<Vec<(String, Vec<Value>)>>,
}

impl FakeDb {
    fn blog() -> Self {
        let mut tables = HashMap::new();
        tables.insert(
            "authors",
            Table {
                columns: Author::COLUMNS,
                rows: vec![author_row("A"), author_row("B"), author_row("C")],
            },
        );
        tables.insert(
            "posts",
            Table {
                columns: Post::COLUMNS,
                rows: vec![post_row(1, "A"), post_row(2, "B"), post_row(3, "A")],
            },
        );

        Self {
            dialect: Dialect::Question,
            tables,
            failure: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    fn failing(mut self, message: &'static str) -> Self {
        self.failure = Some(message);
        self
    }

    fn with_rows(mut self, table: &'static str, rows: Vec<Row>) -> Self {
        if let Some(t) = self.tables.get_mut(table) {
            t.rows = rows;
        }
        self
    }

    fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.borrow().clone()
    }
}

impl QueryExecutor for FakeDb {
    type Error = FakeError;

    fn placeholders(&self, count: usize, start: usize) -> String {
        self.dialect.placeholders(count, start)
    }

    fn query_rows(
        &self,
        _ctx: &QueryContext,
        statement: &str,
        args: &[Value],
    ) -> Result<Vec<Row>, FakeError> {
        self.calls
            .borrow_mut()
            .push((statement.to_string(), args.to_vec()));

        if let Some(message) = self.failure {
            return Err(FakeError(message));
        }

        let table_name = statement
            .split_once("FROM ")
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .ok_or(FakeError("no table"))?;
        let table = self.tables.get(table_name).ok_or(FakeError("unknown table"))?;

        let column = statement
            .split_once(" IN (")
            .and_then(|(head, _)| head.rsplit(' ').next())
            .ok_or(FakeError("no key column"))?;
        let index = table
            .columns
            .iter()
            .position(|c| *c == column)
            .ok_or(FakeError("unknown column"))?;

        Ok(table
            .rows
            .iter()
            .filter(|row| args.contains(&row[index]))
            .cloned()
            .collect())
    }
}

fn posts() -> Collection<Rc<Post>> {
    Collection::from_ordered([post(1, "A"), post(2, "B"), post(3, "A")])
}

fn authors_query() -> RelationQuery {
    RelationQuery::new("SELECT id, name FROM authors")
}

fn posts_query() -> RelationQuery {
    RelationQuery::new("SELECT id, author_id, title FROM posts")
}

const AUTHOR_ID: Column = Column::new("author_id");

fn link_author(p: &Rc<Post>, a: &Rc<Author>) {
    p.author.set(a);
}

fn link_posts(a: &Rc<Author>, posts: Collection<Rc<Post>>) -> Result<(), LinkError> {
    a.posts.set(posts)
}

// ------------------------------------------------------------------
// belongs-to
// ------------------------------------------------------------------

#[test]
fn belongs_to_fetches_unique_keys_in_one_statement() {
    let db = FakeDb::blog();
    let children = posts();

    let parents = load_belongs_to(
        &QueryContext::new(),
        &db,
        &children,
        &authors_query(),
        |p: &Rc<Post>| p.author_id.clone(),
        link_author,
    )
    .expect("load should succeed");

    assert_eq!(
        db.calls(),
        vec![(
            "SELECT id, name FROM authors WHERE id IN (?, ?)".to_string(),
            vec![Value::from("A"), Value::from("B")],
        )]
    );
    assert_eq!(parents.ids(), vec!["A".to_string(), "B".to_string()]);
    assert_eq!(
        parents.find(&"B".to_string()).map(|a| a.name.as_str()),
        Some("author B")
    );

    let first = children.find(&1).and_then(|p| p.author.get()).expect("post 1 linked");
    let third = children.find(&3).and_then(|p| p.author.get()).expect("post 3 linked");
    assert!(Rc::ptr_eq(&first, &third));
}

#[test]
fn belongs_to_empty_key_set_skips_fetch() {
    let db = FakeDb::blog();
    let children: Collection<Rc<Post>> = Collection::new_ordered();

    let parents = load_belongs_to(
        &QueryContext::new(),
        &db,
        &children,
        &authors_query(),
        |p: &Rc<Post>| p.author_id.clone(),
        link_author,
    )
    .expect("empty load should succeed");

    assert!(parents.is_empty());
    assert!(db.calls().is_empty());
}

#[test]
fn belongs_to_fetch_error_is_returned_unmodified() {
    metrics_reset_all();
    let db = FakeDb::blog().failing("connection reset");
    let children = posts();

    let result = load_belongs_to(
        &QueryContext::new(),
        &db,
        &children,
        &authors_query(),
        |p: &Rc<Post>| p.author_id.clone(),
        link_author,
    );

    let Err(err) = result else {
        panic!("fetch failure must surface");
    };
    assert_eq!(err.fetch_error(), Some(&FakeError("connection reset")));
    assert_eq!(err.to_string(), "connection reset");
    assert!(children.iter().all(|p| !p.author.is_linked()));
    assert_eq!(metrics_report().ops.fetch_failures, 1);
}

#[test]
fn belongs_to_reject_policy_links_nothing() {
    let db = FakeDb::blog();
    let children = Collection::from_ordered([post(1, "A"), post(2, "Z")]);
    let loader = Loader::new(
        &db,
        LoaderConfig::default().with_missing_parent(MissingParentPolicy::Reject),
    );

    let result = loader.belongs_to(
        &QueryContext::new(),
        &children,
        &authors_query(),
        |p: &Rc<Post>| p.author_id.clone(),
        link_author,
    );

    assert!(matches!(
        result,
        Err(RelationError::Link(LinkError::MissingParent { missing: 1, .. }))
    ));
    assert!(children.iter().all(|p| !p.author.is_linked()));
}

#[test]
fn belongs_to_scan_failure_links_nothing() {
    let db = FakeDb::blog().with_rows("authors", vec![Row::new(vec![Value::from("A")])]);
    let children = posts();

    let result = load_belongs_to(
        &QueryContext::new(),
        &db,
        &children,
        &authors_query(),
        |p: &Rc<Post>| p.author_id.clone(),
        link_author,
    );

    assert!(matches!(
        result,
        Err(RelationError::Scan {
            row: 0,
            source: ScanError::Arity {
                expected: 2,
                found: 1
            }
        })
    ));
    assert!(children.iter().all(|p| !p.author.is_linked()));
}

#[test]
fn configured_primary_key_and_dialect_shape_statement() {
    let db = FakeDb::blog();
    let children = posts();
    let loader = Loader::new(
        &db,
        LoaderConfig::default().with_dialect(Dialect::Dollar),
    );

    loader
        .belongs_to(
            &QueryContext::new(),
            &children,
            &authors_query(),
            |p: &Rc<Post>| p.author_id.clone(),
            link_author,
        )
        .expect("load should succeed");

    assert_eq!(
        db.calls()[0].0,
        "SELECT id, name FROM authors WHERE id IN ($1, $2)"
    );
}

// ------------------------------------------------------------------
// has-many
// ------------------------------------------------------------------

#[test]
fn has_many_links_every_parent_including_childless() {
    let db = FakeDb::blog();
    let parents = Collection::from_ordered([author("A"), author("B"), author("C")]);

    let children = load_has_many(
        &QueryContext::new(),
        &db,
        &parents,
        &posts_query(),
        &AUTHOR_ID,
        |p: &Rc<Post>| p.author_id.clone(),
        link_posts,
    )
    .expect("load should succeed");

    assert_eq!(
        db.calls(),
        vec![(
            "SELECT id, author_id, title FROM posts WHERE author_id IN (?, ?, ?)".to_string(),
            vec![Value::from("A"), Value::from("B"), Value::from("C")],
        )]
    );
    assert_eq!(children.ids(), vec![1, 2, 3]);

    let a = parents.find(&"A".to_string()).expect("author A");
    assert_eq!(a.posts.borrow().ids(), vec![1, 3]);

    let c = parents.find(&"C".to_string()).expect("author C");
    assert!(c.posts.is_linked());
    assert!(c.posts.is_empty());
}

#[test]
fn has_many_placeholders_follow_prebound_args() {
    let db = FakeDb::blog().with_dialect(Dialect::Dollar);
    let parents = Collection::from_ordered([author("A"), author("B")]);
    let query = posts_query().with_filter("title <> $1").with_arg("draft");

    load_has_many(
        &QueryContext::new(),
        &db,
        &parents,
        &query,
        &AUTHOR_ID,
        |p: &Rc<Post>| p.author_id.clone(),
        link_posts,
    )
    .expect("load should succeed");

    let calls = db.calls();
    assert_eq!(
        calls[0].0,
        "SELECT id, author_id, title FROM posts WHERE (title <> $1) AND author_id IN ($2, $3)"
    );
    assert_eq!(
        calls[0].1,
        vec![Value::from("draft"), Value::from("A"), Value::from("B")]
    );
}

#[test]
fn has_many_filter_with_or_stays_grouped() {
    let db = FakeDb::blog();
    let parents = Collection::from_ordered([author("A"), author("B")]);
    let query = posts_query()
        .with_filter("title = ? OR title = ?")
        .with_arg("post 1")
        .with_arg("post 2")
        .with_tail("ORDER BY id");

    load_has_many(
        &QueryContext::new(),
        &db,
        &parents,
        &query,
        &AUTHOR_ID,
        |p: &Rc<Post>| p.author_id.clone(),
        link_posts,
    )
    .expect("load should succeed");

    assert_eq!(
        db.calls()[0].0,
        "SELECT id, author_id, title FROM posts \
         WHERE (title = ? OR title = ?) AND author_id IN (?, ?) ORDER BY id"
    );
}

#[test]
fn has_many_rejects_invalid_key_column_before_fetch() {
    let db = FakeDb::blog();
    let parents = Collection::from_ordered([author("A")]);

    let result = load_has_many(
        &QueryContext::new(),
        &db,
        &parents,
        &posts_query(),
        &Column::new("author_id) OR (1=1"),
        |p: &Rc<Post>| p.author_id.clone(),
        link_posts,
    );

    let Err(err) = result else {
        panic!("invalid column must be refused");
    };
    assert!(matches!(err, RelationError::Column(_)));
    assert_eq!(err.class(), ErrorClass::UsageContract);
    assert!(db.calls().is_empty());
    assert!(parents.iter().all(|a| !a.posts.is_linked()));
}

#[test]
fn has_many_borrowed_slot_is_a_usage_error() {
    let db = FakeDb::blog();
    let a = author("A");
    let parents = Collection::from_ordered([Rc::clone(&a)]);
    let guard = a.posts.borrow();

    let result = load_has_many(
        &QueryContext::new(),
        &db,
        &parents,
        &posts_query(),
        &AUTHOR_ID,
        |p: &Rc<Post>| p.author_id.clone(),
        link_posts,
    );

    let Err(err) = result else {
        panic!("borrowed slot must be refused");
    };
    assert!(matches!(err, RelationError::Link(LinkError::SlotBorrowed)));
    assert_eq!(err.class(), ErrorClass::UsageContract);
    drop(guard);
    assert!(!a.posts.is_linked());
}

#[test]
fn has_many_without_parents_skips_fetch() {
    let db = FakeDb::blog();
    let parents: Collection<Rc<Author>> = Collection::new_unordered();

    let children = load_has_many(
        &QueryContext::new(),
        &db,
        &parents,
        &posts_query(),
        &AUTHOR_ID,
        |p: &Rc<Post>| p.author_id.clone(),
        link_posts,
    )
    .expect("empty load should succeed");

    assert!(children.is_empty());
    assert!(db.calls().is_empty());
}

#[test]
fn has_many_fetch_error_leaves_parents_unlinked() {
    let db = FakeDb::blog().failing("timeout");
    let parents = Collection::from_ordered([author("A")]);

    let result = load_has_many(
        &QueryContext::new(),
        &db,
        &parents,
        &posts_query(),
        &AUTHOR_ID,
        |p: &Rc<Post>| p.author_id.clone(),
        link_posts,
    );

    assert!(matches!(result, Err(RelationError::Fetch(FakeError("timeout")))));
    assert!(parents.iter().all(|a| !a.posts.is_linked()));
}

// ------------------------------------------------------------------
// plumbing
// ------------------------------------------------------------------

#[test]
fn statement_appends_key_predicate_after_base() {
    let plain = posts_query();
    assert_eq!(
        plain.statement(&AUTHOR_ID, "?"),
        "SELECT id, author_id, title FROM posts WHERE author_id IN (?)"
    );

    let nested = RelationQuery::new(
        "SELECT id, author_id, title FROM (SELECT * FROM posts WHERE draft = 0) live",
    );
    assert_eq!(
        nested.statement(&AUTHOR_ID, "?, ?"),
        "SELECT id, author_id, title FROM (SELECT * FROM posts WHERE draft = 0) live \
         WHERE author_id IN (?, ?)"
    );

    let either = posts_query()
        .with_filter("draft = 0 OR pinned = 1")
        .with_tail("LIMIT 10");
    assert_eq!(
        either.statement(&AUTHOR_ID, "?"),
        "SELECT id, author_id, title FROM posts \
         WHERE (draft = 0 OR pinned = 1) AND author_id IN (?) LIMIT 10"
    );
    assert_eq!(either.filter(), Some("draft = 0 OR pinned = 1"));
    assert_eq!(either.tail(), Some("LIMIT 10"));
}

#[test]
fn belongs_to_rejects_invalid_primary_key_column() {
    let db = FakeDb::blog();
    let children = posts();
    let loader = Loader::new(
        &db,
        LoaderConfig::default().with_primary_key_column(Column::new("id --")),
    );

    let result = loader.belongs_to(
        &QueryContext::new(),
        &children,
        &authors_query(),
        |p: &Rc<Post>| p.author_id.clone(),
        link_author,
    );

    assert!(matches!(result, Err(RelationError::Column(_))));
    assert!(db.calls().is_empty());
}

#[test]
fn relation_query_reads_base_from_store() {
    let store: RawStatementStore = [("authors.base", "SELECT id, name FROM authors")]
        .into_iter()
        .collect();

    let query = RelationQuery::from_store(&store, "authors.base").expect("statement registered");
    assert_eq!(query.select_base(), "SELECT id, name FROM authors");
    assert!(query.args().is_empty());
    assert_eq!(query.next_position(), 1);

    assert!(RelationQuery::from_store(&store, "posts.base").is_err());
}

#[test]
fn load_spans_record_keys_and_rows() {
    metrics_reset_all();
    let db = FakeDb::blog();
    let parents = Collection::from_ordered([author("A"), author("C")]);

    load_has_many(
        &QueryContext::new(),
        &db,
        &parents,
        &posts_query(),
        &AUTHOR_ID,
        |p: &Rc<Post>| p.author_id.clone(),
        link_posts,
    )
    .expect("load should succeed");

    let report = metrics_report();
    assert_eq!(report.ops.has_many_loads, 1);
    assert_eq!(report.ops.keys_requested, 2);
    assert_eq!(report.ops.rows_fetched, 2);
    assert_eq!(report.ops.links, 2);
}
