use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ratatui::text::{Line, Text};
use warden::data::{Directory, DirectoryData, User};
use warden::state::{
    CollectionOptions, CollectionSource, CollectionView, Column, ExpandedRow, PageRequest,
    RowRenderer,
};

/// Create a directory with N users and no groups
fn create_directory(num_users: u32) -> Directory {
    let users = (1..=num_users)
        .map(|pk| User {
            pk,
            username: format!("user{pk:05}"),
            name: format!("User {pk}"),
            email: format!("user{pk}@example.com"),
            is_active: pk % 3 != 0,
            last_login: None,
            groups: Vec::new(),
        })
        .collect();
    Directory::new(DirectoryData {
        users,
        groups: Vec::new(),
    })
}

struct Rows;

impl RowRenderer<User> for Rows {
    fn columns(&self) -> Vec<Column> {
        vec![Column::sortable("Username", "username"), Column::new("Email")]
    }

    fn row(&self, user: &User) -> Vec<Line<'static>> {
        vec![Line::from(user.username.clone()), Line::from(user.email.clone())]
    }

    fn expansion(&self) -> Option<&dyn ExpandedRow<User>> {
        Some(self)
    }
}

impl ExpandedRow<User> for Rows {
    fn expanded(&self, user: &User) -> Text<'static> {
        Text::from(format!("{} <{}>", user.name, user.email))
    }
}

/// Benchmark serving one searched and ordered page
fn bench_fetch_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory_fetch_page");

    for user_count in [100u32, 1_000, 10_000].iter() {
        let directory = create_directory(*user_count);
        let request = PageRequest {
            page: 2,
            page_size: 20,
            ordering: Some("-username".to_string()),
            search: Some("user0".to_string()),
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(user_count),
            user_count,
            |b, _| {
                b.iter(|| {
                    CollectionSource::<User>::fetch_page(&directory, black_box(&request))
                });
            },
        );
    }

    group.finish();
}

/// Benchmark building the table body with every row selected and half expanded
fn bench_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_body");

    for page_size in [20u32, 100, 500].iter() {
        let directory = Arc::new(create_directory(*page_size));
        let options = CollectionOptions::new("users", *page_size)
            .selectable()
            .expandable();
        let mut view = CollectionView::<User>::new(directory, Box::new(Rows), options)
            .expect("renderer provides expansion");
        view.fetch();
        view.poll_blocking(Duration::from_secs(5))
            .expect("fetch completes")
            .expect("directory serves the page");
        view.select_all(true);
        for idx in (0..*page_size as usize).step_by(2) {
            view.toggle_expanded(idx);
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(page_size),
            page_size,
            |b, _| {
                b.iter(|| black_box(view.body()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_fetch_page, bench_body);
criterion_main!(benches);
