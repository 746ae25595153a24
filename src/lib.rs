/*!
# FinanceControl

Invoice management backend for a corporate finance dashboard, built in Rust.

## Overview

Departments submit supplier invoices, finance staff review and approve them and
managers follow spending through a dashboard and reports. Every list screen
(invoices, users, categories) is driven by one generic data-table engine that
searches, sorts and paginates any collection of records.

## Architecture

### Table Engine
- **table**: `DataTable`, `ViewState` and the `Record` trait. Case-insensitive
  substring search over every field including nested entities, stable sorting on
  dotted field paths with missing values last, and 1-based pagination with an
  automatic reset when the current page falls past the end.

### Domain Layer
- **model**: invoices, users, categories, departments, statuses, access levels,
  notifications and conversations
- **permissions**: permission matrices, navigation, action gates and visibility filters
- **forms**: create/edit payloads and their validation rules
- **seed**: fixed catalogs and deterministic generators for demo data
- **store**: the in-process `DataStore` with CRUD and notifications
- **messaging**: the conversation inbox
- **auth**: argon2 passwords, UUID sessions and the persisted session user

### Reporting Layer
- **kpi**: dashboard indicators and report aggregates
- **format**: currency and date formatting
- **downloader**: CSV and XLSX export
- **graph**: PNG charts (`web` feature)

### Persistence
- **saving**: store snapshots with Gzip compression and bincode serialization

### Front Ends
- **app**: axum JSON API with cookie sessions (`web` feature)
- **viewer**: command parsing and rendering for the terminal invoice viewer
- **config**: defaults, environment variables and positional arguments

## REST API Endpoints

- `POST /api/login`, `POST /api/logout`, `GET /api/me` - Session handling
- `GET /api/facturas?search=&sort=&page=&per_page=` - Invoice list through the table engine
- `GET /api/usuarios`, `GET /api/categorias` - Other list screens, same parameters
- `GET /api/dashboard`, `GET /api/reports/\*` - Indicators and reports
- `GET /api/export/facturas.xlsx`, `GET /api/export/facturas.csv` - Export of the current list
- `GET /api/charts/\*.png` - Report charts
*/

pub mod auth;
pub mod config;
pub mod downloader;
pub mod error;
pub mod format;
pub mod forms;
pub mod kpi;
pub mod messaging;
pub mod model;
pub mod permissions;
pub mod saving;
pub mod seed;
pub mod store;
pub mod table;
pub mod viewer;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;

pub use error::{AuthError, FieldError, StoreError, ValidationErrors};
pub use store::DataStore;
pub use table::{
    DataTable, Record, SearchTerm, SortConfig, SortDirection, TableView, Value, ViewState,
};
