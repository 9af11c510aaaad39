//! End-to-end flows against an in-memory SQLite database.

use std::sync::Arc;

use chrono::NaiveDateTime;
use quarry::executor::SqliteExecutor;
use quarry::expr::prop;
use quarry::sql::Sqlite;
use quarry::{
    ConventionReader, Database, DatabaseConfig, DefaultConvention, Entity, GeneratedCommand, Naming,
    Provider, QuarryError, TranslationError,
};

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    #[quarry(collection)]
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub pages: i32,
    pub in_print: bool,
    pub published_at: Option<NaiveDateTime>,
    #[quarry(reference)]
    pub author: Option<Author>,
}

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE "Author" ("Id" INTEGER PRIMARY KEY AUTOINCREMENT, "Name" TEXT NOT NULL, "Email" TEXT)"#,
    r#"CREATE TABLE "Book" ("Id" INTEGER PRIMARY KEY AUTOINCREMENT, "Title" TEXT NOT NULL, "Pages" INTEGER NOT NULL, "InPrint" INTEGER NOT NULL, "PublishedAt" TEXT, "AuthorId" INTEGER REFERENCES "Author" ("Id"))"#,
];

fn database() -> Database {
    let db = Database::new(
        Arc::new(Sqlite),
        Arc::new(ConventionReader::new(DefaultConvention)),
        Arc::new(SqliteExecutor::new()),
        "sqlite::memory:",
    );
    let ddl: Vec<_> = SCHEMA
        .iter()
        .map(|sql| GeneratedCommand::new(*sql, vec![]))
        .collect();
    db.execute(&ddl).unwrap();
    db
}

fn author(db: &Database, name: &str) -> Author {
    let mut author = Author {
        name: name.to_string(),
        ..Default::default()
    };
    db.insert(&mut author).unwrap();
    author
}

fn book(db: &Database, title: &str, pages: i32, author: &Author) -> Book {
    let mut book = Book {
        title: title.to_string(),
        pages,
        in_print: true,
        author: Some(author.clone()),
        ..Default::default()
    };
    db.insert(&mut book).unwrap();
    book
}

#[test]
fn test_insert_assigns_identity_and_find_round_trips() {
    let db = database();
    let first = author(&db, "Le Guin");
    let second = author(&db, "Banks");
    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);

    let published = NaiveDateTime::parse_from_str("1969-03-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
    let mut inserted = Book {
        title: "The Left Hand of Darkness".to_string(),
        pages: 304,
        in_print: true,
        published_at: Some(published),
        author: Some(first.clone()),
        ..Default::default()
    };
    db.insert(&mut inserted).unwrap();
    assert_eq!(inserted.id, 1);

    let found = db.find::<Book>(inserted.id).unwrap().unwrap();
    assert_eq!(found.title, inserted.title);
    assert_eq!(found.pages, 304);
    assert!(found.in_print);
    assert_eq!(found.published_at, Some(published));
    // Navigations are only populated when included
    assert_eq!(found.author, None);

    assert!(db.find::<Book>(99i64).unwrap().is_none());
}

#[test]
fn test_filter_by_reference_and_null() {
    let db = database();
    let le_guin = author(&db, "Le Guin");
    let banks = author(&db, "Banks");
    book(&db, "Earthsea", 200, &le_guin);
    book(&db, "Excession", 450, &banks);
    book(&db, "The Dispossessed", 380, &le_guin);

    let titles: Vec<String> = db
        .query::<Book>()
        .select("Title")
        .filter(prop("Author").then("Id").eq(le_guin.id))
        .order_by("Title")
        .execute_scalar_list()
        .unwrap();
    assert_eq!(titles, vec!["Earthsea", "The Dispossessed"]);

    let without_email = db
        .query::<Author>()
        .filter(prop("Email").eq(None::<String>))
        .count()
        .unwrap();
    assert_eq!(without_email, 2);
}

#[test]
fn test_include_populates_reference() {
    let db = database();
    let banks = author(&db, "Banks");
    book(&db, "Excession", 450, &banks);
    let mut orphan = Book {
        title: "Anonymous".to_string(),
        pages: 10,
        ..Default::default()
    };
    db.insert(&mut orphan).unwrap();

    let books = db
        .query::<Book>()
        .include::<Author>("Author")
        .order_by("Id")
        .execute_list()
        .unwrap();
    assert_eq!(books.len(), 2);
    let nested = books[0].author.as_ref().unwrap();
    assert_eq!(nested.id, banks.id);
    assert_eq!(nested.name, "Banks");
    assert_eq!(books[1].author, None);
}

#[test]
fn test_collection_join_groups_children() {
    let db = database();
    let le_guin = author(&db, "Le Guin");
    let banks = author(&db, "Banks");
    let lonely = author(&db, "Nobody");
    book(&db, "Earthsea", 200, &le_guin);
    book(&db, "Excession", 450, &banks);
    book(&db, "The Dispossessed", 380, &le_guin);

    let authors = db
        .query::<Author>()
        .join::<Book>("Author", "Books")
        .order_by("Id")
        .execute_list()
        .unwrap();
    assert_eq!(authors.len(), 3);
    assert_eq!(authors[0].name, "Le Guin");
    assert_eq!(authors[0].books.len(), 2);
    assert_eq!(authors[1].books.len(), 1);
    assert_eq!(authors[2].id, lonely.id);
    assert!(authors[2].books.is_empty());
}

#[test]
fn test_paging_orders_by_identity() {
    let db = database();
    let banks = author(&db, "Banks");
    for (i, title) in ["E", "D", "C", "B", "A"].iter().enumerate() {
        book(&db, title, i as i32, &banks);
    }

    let page: Vec<i64> = db
        .query::<Book>()
        .select("Id")
        .page(1, 2)
        .execute_scalar_list()
        .unwrap();
    assert_eq!(page, vec![3, 4]);

    let by_title: Vec<String> = db
        .query::<Book>()
        .select("Title")
        .order_by("Title")
        .page(0, 2)
        .execute_scalar_list()
        .unwrap();
    assert_eq!(by_title, vec!["A", "B"]);

    let past_end = db.query::<Book>().page(10, 2).execute_list().unwrap();
    assert!(past_end.is_empty());
}

#[test]
fn test_update_and_delete() {
    let db = database();
    let banks = author(&db, "Banks");
    let mut excession = book(&db, "Excession", 450, &banks);
    book(&db, "Matter", 600, &banks);

    let affected = db
        .update::<Book>()
        .set("InPrint", false)
        .filter(prop("Title").eq("Matter".to_string()))
        .execute()
        .unwrap();
    assert_eq!(affected, 1);
    let in_print = db
        .query::<Book>()
        .filter(prop("InPrint").eq(true))
        .count()
        .unwrap();
    assert_eq!(in_print, 1);

    excession.pages = 451;
    assert_eq!(db.update_entity(&excession).unwrap(), 1);
    let pages: Option<i32> = db
        .query::<Book>()
        .select("Pages")
        .filter(prop("Id").eq(excession.id))
        .execute_scalar()
        .unwrap();
    assert_eq!(pages, Some(451));

    assert_eq!(db.delete_entity(&excession).unwrap(), 1);
    assert_eq!(
        db.delete::<Book>()
            .filter(prop("Pages").eq(600))
            .execute()
            .unwrap(),
        1
    );
    assert_eq!(db.query::<Book>().count().unwrap(), 0);
}

#[test]
fn test_update_entity_keeps_unloaded_reference() {
    let db = database();
    let banks = author(&db, "Banks");
    let le_guin = author(&db, "Le Guin");
    let created = book(&db, "Excession", 450, &banks);

    let mut loaded = db.find::<Book>(created.id).unwrap().unwrap();
    assert_eq!(loaded.author, None);
    loaded.pages = 460;
    assert_eq!(db.update_entity(&loaded).unwrap(), 1);

    let by_banks = db
        .query::<Book>()
        .filter(prop("Author").then("Id").eq(banks.id))
        .count()
        .unwrap();
    assert_eq!(by_banks, 1);

    // A loaded reference is written through
    loaded.author = Some(le_guin.clone());
    db.update_entity(&loaded).unwrap();
    let reloaded = db
        .query::<Book>()
        .include::<Author>("Author")
        .filter(prop("Id").eq(created.id))
        .execute_list()
        .unwrap();
    assert_eq!(reloaded[0].pages, 460);
    assert_eq!(reloaded[0].author.as_ref().map(|a| a.id), Some(le_guin.id));
}

#[test]
fn test_rejections_happen_before_execution() {
    let db = database();
    let err = db
        .query::<Book>()
        .include::<Author>("Author")
        .top(1)
        .execute_list()
        .unwrap_err();
    assert!(matches!(err, QuarryError::Translation(TranslationError::TopWithJoin)));

    let err = db
        .query::<Book>()
        .filter(prop("Pages").eq(1).or(prop("Pages").eq(2)))
        .execute_list()
        .unwrap_err();
    assert!(matches!(
        err,
        QuarryError::Translation(TranslationError::UnsupportedPredicate { .. })
    ));
}

#[test]
fn test_async_list() {
    let db = database();
    let banks = author(&db, "Banks");
    book(&db, "Excession", 450, &banks);

    let books = db.query::<Book>().execute_list_async().wait().unwrap();
    assert_eq!(books.len(), 1);

    let (tx, rx) = crossbeam_channel::bounded(1);
    db.query::<Book>()
        .filter(prop("Title").eq("Excession".to_string()))
        .execute_async()
        .dispatch(
            move |book| {
                let _ = tx.send(book.map(|b| b.pages));
            },
            Some(Box::new(|err| panic!("unexpected failure: {}", err))),
        );
    assert_eq!(rx.recv().unwrap(), Some(450));
}

#[test]
fn test_from_config_with_snake_case_naming() {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        provider: Provider::Sqlite,
        naming: Naming::SnakeCase,
    };
    let db = Database::from_config(&config).unwrap();
    db.execute(&[
        GeneratedCommand::new(
            r#"CREATE TABLE "author" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "name" TEXT NOT NULL, "email" TEXT)"#,
            vec![],
        ),
    ])
    .unwrap();

    let mut created = author(&db, "Jemisin");
    let found = db.find::<Author>(created.id).unwrap().unwrap();
    assert_eq!(found.name, "Jemisin");

    created.email = Some("nk@example.com".to_string());
    assert_eq!(db.update_entity(&created).unwrap(), 1);
    let email: Option<String> = db
        .query::<Author>()
        .select("Email")
        .filter(prop("Id").eq(created.id))
        .execute_scalar()
        .unwrap();
    assert_eq!(email.as_deref(), Some("nk@example.com"));
}
