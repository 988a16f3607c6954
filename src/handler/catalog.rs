//! Catalog endpoints: books (paginated, searchable), authors, categories.
//!
//! Book reads are open to any authenticated user; writes are restricted
//! to admins and owners. The book list is the one endpoint that returns a
//! page envelope instead of a bare array.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use crate::auth::{require_admin, CurrentUser};
use crate::database::{
    delete_record, get_record, list_records, next_id, put_record, AppState, TABLE_AUTHORS,
    TABLE_BOOKS, TABLE_CATEGORIES,
};
use crate::error::ApiError;
use crate::model::{
    Author, AuthorPayload, Book, BookListParams, BookOut, BookPayload, Category, CategoryPayload,
    Page,
};

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 1000;

fn book_out(
    book: Book,
    authors: &HashMap<u64, String>,
    categories: &HashMap<u64, String>,
) -> BookOut {
    BookOut {
        id: book.id,
        isbn: book.isbn,
        title: book.title,
        author_id: book.author_id,
        author_name: authors.get(&book.author_id).cloned().unwrap_or_default(),
        category_id: book.category_id,
        category_name: book
            .category_id
            .and_then(|id| categories.get(&id).cloned()),
        quantity: book.quantity,
        available_count: book.available_count,
        is_available: book.available_count > 0,
        description: book.description,
        published_year: book.published_year,
        created_at: book.created_at,
    }
}

fn author_names(state: &AppState) -> Result<HashMap<u64, String>, ApiError> {
    Ok(list_records::<Author>(&state.db, TABLE_AUTHORS)?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect())
}

fn category_names(state: &AppState) -> Result<HashMap<u64, String>, ApiError> {
    Ok(list_records::<Category>(&state.db, TABLE_CATEGORIES)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

pub async fn list_books(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<BookListParams>,
) -> Result<Json<Page<BookOut>>, ApiError> {
    let authors = author_names(&state)?;
    let categories = category_names(&state)?;

    let mut books: Vec<Book> = list_records(&state.db, TABLE_BOOKS)?;

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        books.retain(|book| {
            book.title.to_lowercase().contains(&needle)
                || book.isbn.to_lowercase().contains(&needle)
                || authors
                    .get(&book.author_id)
                    .map(|name| name.to_lowercase().contains(&needle))
                    .unwrap_or(false)
        });
    }

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let count = books.len();
    let last_page = count.div_ceil(page_size).max(1);

    let results: Vec<BookOut> = books
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(|book| book_out(book, &authors, &categories))
        .collect();

    Ok(Json(Page {
        count,
        next: (page < last_page).then_some(page + 1),
        previous: (page > 1).then_some(page - 1),
        results,
    }))
}

pub async fn create_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<BookPayload>,
) -> Result<Response, ApiError> {
    require_admin(&user.0)?;

    if payload.quantity == 0 {
        return Err(ApiError::validation("Quantity must be at least 1"));
    }
    if get_record::<Author>(&state.db, TABLE_AUTHORS, payload.author_id)?.is_none() {
        return Err(ApiError::validation("Unknown author"));
    }
    if let Some(category_id) = payload.category_id {
        if get_record::<Category>(&state.db, TABLE_CATEGORIES, category_id)?.is_none() {
            return Err(ApiError::validation("Unknown category"));
        }
    }
    let existing: Vec<Book> = list_records(&state.db, TABLE_BOOKS)?;
    if existing.iter().any(|b| b.isbn == payload.isbn) {
        return Err(ApiError::conflict("A book with this ISBN already exists"));
    }

    let now = Utc::now();
    let write_txn = state.db.begin_write()?;
    let book = {
        let id = next_id(&write_txn, "books")?;
        let book = Book {
            id,
            isbn: payload.isbn,
            title: payload.title,
            author_id: payload.author_id,
            category_id: payload.category_id,
            quantity: payload.quantity,
            // All copies start on the shelf
            available_count: payload.quantity,
            description: payload.description,
            published_year: payload.published_year,
            created_at: now,
            updated_at: now,
        };
        put_record(&write_txn, TABLE_BOOKS, id, &book)?;
        book
    };
    write_txn.commit()?;

    let authors = author_names(&state)?;
    let categories = category_names(&state)?;
    Ok((StatusCode::CREATED, Json(book_out(book, &authors, &categories))).into_response())
}

pub async fn get_book(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<BookOut>, ApiError> {
    let book: Book = get_record(&state.db, TABLE_BOOKS, id)?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;
    let authors = author_names(&state)?;
    let categories = category_names(&state)?;
    Ok(Json(book_out(book, &authors, &categories)))
}

pub async fn update_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<BookOut>, ApiError> {
    require_admin(&user.0)?;

    if payload.quantity == 0 {
        return Err(ApiError::validation("Quantity must be at least 1"));
    }
    let existing: Vec<Book> = list_records(&state.db, TABLE_BOOKS)?;
    if existing.iter().any(|b| b.isbn == payload.isbn && b.id != id) {
        return Err(ApiError::conflict("A book with this ISBN already exists"));
    }

    let write_txn = state.db.begin_write()?;
    let book = {
        let mut book: Book = crate::database::get_for_update(&write_txn, TABLE_BOOKS, id)?
            .ok_or_else(|| ApiError::not_found("Book not found"))?;

        book.isbn = payload.isbn;
        book.title = payload.title;
        book.author_id = payload.author_id;
        book.category_id = payload.category_id;
        book.quantity = payload.quantity;
        // Editing the total never credits copies back; it only caps
        book.available_count = book.available_count.min(book.quantity);
        book.description = payload.description;
        book.published_year = payload.published_year;
        book.updated_at = Utc::now();

        put_record(&write_txn, TABLE_BOOKS, id, &book)?;
        book
    };
    write_txn.commit()?;

    let authors = author_names(&state)?;
    let categories = category_names(&state)?;
    Ok(Json(book_out(book, &authors, &categories)))
}

pub async fn delete_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user.0)?;

    let write_txn = state.db.begin_write()?;
    let removed = delete_record(&write_txn, TABLE_BOOKS, id)?;
    write_txn.commit()?;

    if !removed {
        return Err(ApiError::not_found("Book not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_authors(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(list_records(&state.db, TABLE_AUTHORS)?))
}

pub async fn create_author(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<AuthorPayload>,
) -> Result<Response, ApiError> {
    require_admin(&user.0)?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Author name is required"));
    }
    let existing: Vec<Author> = list_records(&state.db, TABLE_AUTHORS)?;
    if existing.iter().any(|a| a.name == payload.name) {
        return Err(ApiError::conflict("Author already exists"));
    }

    let write_txn = state.db.begin_write()?;
    let author = {
        let id = next_id(&write_txn, "authors")?;
        let author = Author {
            id,
            name: payload.name,
            bio: payload.bio,
            created_at: Utc::now(),
        };
        put_record(&write_txn, TABLE_AUTHORS, id, &author)?;
        author
    };
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(author)).into_response())
}

pub async fn list_categories(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(list_records(&state.db, TABLE_CATEGORIES)?))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CategoryPayload>,
) -> Result<Response, ApiError> {
    require_admin(&user.0)?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Category name is required"));
    }
    let existing: Vec<Category> = list_records(&state.db, TABLE_CATEGORIES)?;
    if existing.iter().any(|c| c.name == payload.name) {
        return Err(ApiError::conflict("Category already exists"));
    }

    let write_txn = state.db.begin_write()?;
    let category = {
        let id = next_id(&write_txn, "categories")?;
        let category = Category { id, name: payload.name, created_at: Utc::now() };
        put_record(&write_txn, TABLE_CATEGORIES, id, &category)?;
        category
    };
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(category)).into_response())
}
