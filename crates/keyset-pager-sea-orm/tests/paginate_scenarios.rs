//! End-to-end scenarios against an in-memory sqlite connection, covering
//! the five-product dataset and the forward/backward navigation and
//! filter/ordering combinations.

use bigdecimal::BigDecimal;
use keyset_pager::ast::{CompareOperator, Expr, Value};
use keyset_pager::ordering::{OrderKey, OrderingSpec, SortDir};
use keyset_pager::{Error, PageOptions};
use keyset_pager_sea_orm::{FieldKind, FieldMap, SeaOrmPager};
use sea_orm::entity::prelude::*;
use sea_orm::{Database, DatabaseConnection, Set};

mod product {
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "product")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub category: String,
        pub price: i64,
        pub likes: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

async fn setup() -> DatabaseConnection {
    let conn = Database::connect("sqlite::memory:").await.expect("connect");
    conn.execute_unprepared(
        "CREATE TABLE product (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            price INTEGER NOT NULL,
            likes INTEGER NOT NULL
        )",
    )
    .await
    .expect("create table");

    let rows = [
        (1, "Laptop", "electronics", 100_000, 50),
        (2, "Phone", "electronics", 80_000, 100),
        (3, "Book", "books", 20_000, 30),
        (4, "Tablet", "electronics", 60_000, 70),
        (5, "Magazine", "books", 5_000, 10),
    ];
    for (id, name, category, price, likes) in rows {
        product::Entity::insert(product::ActiveModel {
            id: Set(id),
            name: Set(name.to_owned()),
            category: Set(category.to_owned()),
            price: Set(price),
            likes: Set(likes),
        })
        .exec(&conn)
        .await
        .expect("seed row");
    }
    conn
}

fn field_map() -> FieldMap<product::Entity> {
    FieldMap::new()
        .insert_with_extractor("id", product::Column::Id, FieldKind::I64, |m| m.id.to_string())
        .insert_with_extractor("name", product::Column::Name, FieldKind::String, |m| m.name.clone())
        .insert_with_extractor("category", product::Column::Category, FieldKind::String, |m| {
            m.category.clone()
        })
        .insert_with_extractor("price", product::Column::Price, FieldKind::I64, |m| m.price.to_string())
        .insert_with_extractor("likes", product::Column::Likes, FieldKind::I64, |m| m.likes.to_string())
}

fn ids(page: &keyset_pager::Paginated<product::Model>) -> Vec<i64> {
    page.items.iter().map(|m| m.id).collect()
}

#[tokio::test]
async fn s1_first_page_ascending_by_id() {
    let conn = setup().await;
    let fields = field_map();
    let ordering = OrderingSpec(vec![OrderKey { field: "id".to_owned(), dir: SortDir::Asc }]);
    let options = PageOptions::new(None, 2, false).unwrap();

    let page = SeaOrmPager::new(product::Entity::find(), &fields, &conn)
        .order(ordering)
        .paginate(&options)
        .await
        .unwrap();

    assert_eq!(page.total_size, 5);
    assert_eq!(ids(&page), vec![1, 2]);
    assert!(page.prev.is_none());
    assert!(page.next.is_some());
}

#[tokio::test]
async fn s2_second_page_follows_s1_next() {
    let conn = setup().await;
    let fields = field_map();
    let ordering = OrderingSpec(vec![OrderKey { field: "id".to_owned(), dir: SortDir::Asc }]);
    let options1 = PageOptions::new(None, 2, false).unwrap();

    let page1 = SeaOrmPager::new(product::Entity::find(), &fields, &conn)
        .order(ordering.clone())
        .paginate(&options1)
        .await
        .unwrap();

    let options2 = PageOptions::new(page1.next.as_deref(), 2, false).unwrap();
    let page2 = SeaOrmPager::new(product::Entity::find(), &fields, &conn)
        .order(ordering)
        .paginate(&options2)
        .await
        .unwrap();

    assert_eq!(ids(&page2), vec![3, 4]);
    assert!(page2.prev.is_some());
    assert!(page2.next.is_some());
}

#[tokio::test]
async fn s3_filtered_electronics_over_50000_ordered_by_likes_desc() {
    let conn = setup().await;
    let fields = field_map();
    let filter = Expr::And(vec![
        Expr::Compare(
            Box::new(Expr::Identifier("price".to_owned())),
            CompareOperator::Ge,
            Box::new(Expr::Value(Value::Number(BigDecimal::from(50_000)))),
        ),
        Expr::Compare(
            Box::new(Expr::Identifier("category".to_owned())),
            CompareOperator::Eq,
            Box::new(Expr::Value(Value::String("electronics".to_owned()))),
        ),
    ]);

    let builder = keyset_pager_sea_orm::SeaOrmPredicateBuilder { fields: &fields };
    let condition = keyset_pager::lower(&builder, &filter).unwrap();

    let ordering = OrderingSpec(vec![OrderKey { field: "likes".to_owned(), dir: SortDir::Desc }]);
    let options = PageOptions::new(None, 2, false).unwrap();

    let select = product::Entity::find().filter(condition);
    let page = SeaOrmPager::new(select, &fields, &conn)
        .order(ordering)
        .paginate(&options)
        .await
        .unwrap();

    assert_eq!(page.total_size, 3);
    assert_eq!(ids(&page), vec![2, 4]);
    assert!(page.next.is_some());
}

#[tokio::test]
async fn s4_backward_navigation_returns_to_first_page() {
    let conn = setup().await;
    let fields = field_map();
    let ordering = OrderingSpec(vec![OrderKey { field: "id".to_owned(), dir: SortDir::Asc }]);

    let options1 = PageOptions::new(None, 2, false).unwrap();
    let page1 = SeaOrmPager::new(product::Entity::find(), &fields, &conn)
        .order(ordering.clone())
        .paginate(&options1)
        .await
        .unwrap();

    let options2 = PageOptions::new(page1.next.as_deref(), 2, false).unwrap();
    let page2 = SeaOrmPager::new(product::Entity::find(), &fields, &conn)
        .order(ordering.clone())
        .paginate(&options2)
        .await
        .unwrap();

    let options3 = PageOptions::new(page2.prev.as_deref(), 2, false).unwrap();
    let page3 = SeaOrmPager::new(product::Entity::find(), &fields, &conn)
        .order(ordering)
        .paginate(&options3)
        .await
        .unwrap();

    assert_eq!(ids(&page3), vec![1, 2]);
}

#[tokio::test]
async fn s5_include_prev_cursor_on_full_page() {
    let conn = setup().await;
    let fields = field_map();
    let ordering = OrderingSpec(vec![OrderKey { field: "id".to_owned(), dir: SortDir::Desc }]);
    let options = PageOptions::new(None, 5, true).unwrap();

    let page = SeaOrmPager::new(product::Entity::find(), &fields, &conn)
        .order(ordering)
        .paginate(&options)
        .await
        .unwrap();

    assert_eq!(ids(&page), vec![5, 4, 3, 2, 1]);
    assert!(page.prev.is_some());
    assert!(page.next.is_none());
}

#[tokio::test]
async fn s6_cursor_ordering_mismatch_is_rejected() {
    let conn = setup().await;
    let fields = field_map();

    let asc = OrderingSpec(vec![OrderKey { field: "id".to_owned(), dir: SortDir::Asc }]);
    let options1 = PageOptions::new(None, 2, false).unwrap();
    let page1 = SeaOrmPager::new(product::Entity::find(), &fields, &conn)
        .order(asc)
        .paginate(&options1)
        .await
        .unwrap();
    let next_cursor = page1.next.expect("first page has a next cursor");

    let desc = OrderingSpec(vec![OrderKey { field: "id".to_owned(), dir: SortDir::Desc }]);
    let options2 = PageOptions::new(Some(&next_cursor), 2, false).unwrap();
    let err = SeaOrmPager::new(product::Entity::find(), &fields, &conn)
        .order(desc)
        .paginate(&options2)
        .await
        .unwrap_err();

    assert!(matches!(err, keyset_pager_sea_orm::Error::Core(Error::Cursor(_))));
}
