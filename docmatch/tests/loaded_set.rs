//! Typed entities matched and selected through the facade.

use bson::{DateTime, Uuid, doc};
use chrono::{TimeZone, Utc};
use docmatch::{memory::LoadedSet, prelude::*};
use futures::executor::block_on;
use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Ticket {
    id: Uuid,
    title: String,
    priority: i32,
    labels: Vec<String>,
    opened: DateTime,
    assignee: Option<String>,
}

impl Document for Ticket {
    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        "tickets"
    }
}

fn opened(day: u32) -> DateTime {
    DateTime::from_chrono(Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap())
}

fn ticket(title: &str, priority: i32, labels: &[&str], day: u32, assignee: Option<&str>) -> Ticket {
    Ticket {
        id: Uuid::from(uuid::Uuid::new_v4()),
        title: title.to_string(),
        priority,
        labels: labels.iter().map(|label| label.to_string()).collect(),
        opened: opened(day),
        assignee: assignee.map(str::to_string),
    }
}

fn tickets() -> Vec<Ticket> {
    vec![
        ticket("Login fails", 1, &["bug", "auth"], 4, Some("kim")),
        ticket("Dark mode", 3, &["feature"], 2, None),
        ticket("Slow search", 2, &["bug", "perf"], 9, Some("ola")),
        ticket("Typo in footer", 4, &["bug"], 1, None),
    ]
}

fn loaded() -> LoadedSet {
    block_on(async {
        let set = LoadedSet::new();
        for ticket in tickets() {
            set.load_entity(&ticket).await.unwrap();
        }
        set
    })
}

fn titles(selected: &[Ticket]) -> Vec<&str> {
    selected.iter().map(|ticket| ticket.title.as_str()).collect()
}

#[test]
fn matchers_accept_typed_entities() {
    let bugs = Matcher::new(&doc! { "labels": "bug", "assignee": null }).unwrap();
    let matched = tickets()
        .into_iter()
        .filter(|ticket| bugs.matches_entity(ticket).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(titles(&matched), vec!["Typo in footer"]);
}

#[test]
fn dates_compare_chronologically() {
    let recent = Filter::gte("opened", opened(4)).parse().unwrap();
    let matcher = Matcher::from_expr(recent);

    let matched = tickets()
        .into_iter()
        .filter(|ticket| matcher.matches_entity(ticket).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(titles(&matched), vec!["Login fails", "Slow search"]);
}

#[test]
fn select_filters_sorts_and_pages() {
    let set = loaded();

    let query = Query::builder()
        .filter(Filter::eq("labels", "bug").parse().unwrap())
        .sort("priority", SortDirection::Desc)
        .offset(1)
        .limit(1)
        .build();

    let selected = block_on(set.select_typed::<Ticket>(&query)).unwrap();
    assert_eq!(titles(&selected), vec!["Slow search"]);
}

#[test]
fn select_without_filter_returns_everything_sorted() {
    let set = loaded();
    let query = Query::builder().sort("opened", SortDirection::Asc).build();

    let selected = block_on(set.select_typed::<Ticket>(&query)).unwrap();
    assert_eq!(
        titles(&selected),
        vec!["Typo in footer", "Dark mode", "Login fails", "Slow search"]
    );
}

#[test]
fn missing_sort_keys_come_first() {
    let set = loaded();
    let query = Query::builder().sort("assignee", SortDirection::Asc).build();

    let selected = block_on(set.select_typed::<Ticket>(&query)).unwrap();

    // Unassigned tickets serialize an explicit null, which sorts before strings.
    assert!(selected[0].assignee.is_none());
    assert!(selected[1].assignee.is_none());
    assert_eq!(selected[2].assignee.as_deref(), Some("kim"));
}

#[test]
fn count_and_first() {
    let set = loaded();

    let urgent = Filter::new()
        .with(Field::new("priority").lte(2))
        .with(Field::new("labels").all(["bug"]))
        .parse()
        .unwrap();
    assert_eq!(block_on(set.count(&urgent)), 2);

    let query = Query::builder()
        .filter(urgent)
        .sort("opened", SortDirection::Desc)
        .build();
    let first = block_on(set.first(&query)).unwrap().unwrap();
    assert_eq!(first.get_str("title").unwrap(), "Slow search");
}

#[test]
fn builders_cover_logical_operators() {
    let set = loaded();

    let filter = Filter::or([
        Filter::field(Field::new("labels").size(2).elem_match_value(|field| field.eq("perf"))),
        Filter::field(Field::new("title").regex("^dark", "i")),
    ])
    .comment("perf bugs or dark mode");

    let query = Query::builder()
        .filter(filter.parse().unwrap())
        .sort("title", SortDirection::Asc)
        .build();

    let selected = block_on(set.select_typed::<Ticket>(&query)).unwrap();
    assert_eq!(titles(&selected), vec!["Dark mode", "Slow search"]);
}

#[test]
fn invalid_sort_paths_are_rejected() {
    let set = loaded();
    let query = Query::builder().sort("labels..name", SortDirection::Asc).build();

    let err = block_on(set.select(&query)).unwrap_err();
    assert!(matches!(err, QueryError::InvalidQuery { .. }));
}

#[test]
fn entities_round_trip_through_the_set() {
    let set = LoadedSet::new();
    let original = ticket("Crash on save", 1, &["bug"], 7, Some("kim"));

    block_on(set.load_entity(&original)).unwrap();
    let stored = block_on(set.get(original.id())).unwrap();

    assert_eq!(Ticket::from_bson(bson::Bson::Document(stored)).unwrap(), original);
}
