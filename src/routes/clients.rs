use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ValidationErrors},
    models::{Client, ContactPerson, NewClient, NewContactPerson},
    schema::{clients, contact_people},
    state::AppState,
    storage::{self, FileCategory},
    utils::{
        multipart::FormData,
        pagination::{PageParams, Pagination},
        response::{self, Envelope},
    },
};

#[derive(Serialize)]
pub struct ClientResponse {
    #[serde(flatten)]
    pub client: Client,
    pub logo_url: Option<String>,
    pub contacts: Vec<ContactPerson>,
}

#[derive(Deserialize)]
struct ContactInput {
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    position: Option<String>,
}

#[derive(Deserialize)]
pub struct ListClientsParams {
    #[serde(flatten)]
    page: PageParams,
    search: Option<String>,
}

pub async fn list_clients(
    State(state): State<AppState>,
    Query(params): Query<ListClientsParams>,
) -> AppResult<Json<Envelope<Vec<ClientResponse>>>> {
    let mut conn = state.db()?;

    let mut count_query = clients::table.into_boxed();
    let mut query = clients::table.into_boxed();
    if let Some(search) = params.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        count_query = count_query.filter(clients::name.ilike(pattern.clone()));
        query = query.filter(clients::name.ilike(pattern));
    }

    let total: i64 = count_query.count().get_result(&mut conn)?;

    query = match (params.page.sort_column(), params.page.descending()) {
        (Some("name"), true) => query.order(clients::name.desc()),
        (Some("name"), false) => query.order(clients::name.asc()),
        (_, true) => query.order(clients::created_at.desc()),
        (_, false) => query.order(clients::created_at.asc()),
    };

    let rows: Vec<Client> = query
        .offset(params.page.offset())
        .limit(params.page.per_page())
        .load(&mut conn)?;

    let contacts: Vec<ContactPerson> = ContactPerson::belonging_to(&rows).load(&mut conn)?;
    let grouped = contacts.grouped_by(&rows);

    let data = rows
        .into_iter()
        .zip(grouped)
        .map(|(client, contacts)| to_response(&state, client, contacts))
        .collect();

    let pagination = Pagination::new(params.page.page(), params.page.per_page(), total);
    Ok(response::ok_paginated(
        data,
        "clients retrieved successfully",
        pagination,
    ))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<ClientResponse>>> {
    let mut conn = state.db()?;
    let client: Client = clients::table.find(id).first(&mut conn)?;
    let contacts: Vec<ContactPerson> = ContactPerson::belonging_to(&client).load(&mut conn)?;
    Ok(response::ok(
        to_response(&state, client, contacts),
        "client retrieved successfully",
    ))
}

pub async fn create_client(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Envelope<ClientResponse>>)> {
    let form = FormData::read(&mut multipart).await?;

    let mut errors = ValidationErrors::new();
    let name = form.value("name").unwrap_or_default().trim().to_string();
    if name.is_empty() {
        errors.add("name", "name is required");
    }

    let contact_inputs = parse_contacts(&form, &mut errors)?;

    let logo = form.file("logo");
    if let Some(file) = logo {
        for problem in storage::check_upload(FileCategory::ClientLogos, &file.original_name, file.size())
        {
            errors.add("logo", problem);
        }
        if !storage::looks_like_image(&file.bytes) {
            errors.add("logo", "logo must be a valid image");
        }
    }
    errors.into_result()?;

    // The file is written before the row so a failed insert never leaves a
    // row pointing at a missing file.
    let mut logo_path = None;
    if let Some(file) = logo {
        let path = storage::build_storage_path(
            FileCategory::ClientLogos,
            &file.original_name,
            Utc::now(),
        );
        state.files.put(&path, file.bytes.clone()).await?;
        logo_path = Some(path);
    }

    let client_id = Uuid::new_v4();
    let new_client = NewClient {
        id: client_id,
        name,
        logo_path: logo_path.clone(),
    };

    let mut conn = state.db()?;
    let inserted = conn.transaction::<_, AppError, _>(|conn| {
        diesel::insert_into(clients::table)
            .values(&new_client)
            .execute(conn)?;
        insert_contacts(conn, client_id, &contact_inputs)?;
        Ok(())
    });

    if let Err(err) = inserted {
        if let Some(path) = logo_path {
            let _ = state.files.delete(&path).await;
        }
        return Err(err);
    }

    let client: Client = clients::table.find(client_id).first(&mut conn)?;
    let contacts: Vec<ContactPerson> = ContactPerson::belonging_to(&client).load(&mut conn)?;
    tracing::info!(client_id = %client.id, "client created");
    Ok(response::created(
        to_response(&state, client, contacts),
        "client created successfully",
    ))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Envelope<ClientResponse>>> {
    let form = FormData::read(&mut multipart).await?;

    let mut conn = state.db()?;
    let existing: Client = clients::table.find(id).first(&mut conn)?;

    let mut errors = ValidationErrors::new();
    let name = match form.value("name") {
        Some(value) if value.trim().is_empty() => {
            errors.add("name", "name cannot be empty");
            existing.name.clone()
        }
        Some(value) => value.trim().to_string(),
        None => existing.name.clone(),
    };

    let contact_inputs = if form.has_value("contacts") {
        Some(parse_contacts(&form, &mut errors)?)
    } else {
        None
    };

    let logo = form.file("logo");
    if let Some(file) = logo {
        for problem in storage::check_upload(FileCategory::ClientLogos, &file.original_name, file.size())
        {
            errors.add("logo", problem);
        }
        if !storage::looks_like_image(&file.bytes) {
            errors.add("logo", "logo must be a valid image");
        }
    }
    errors.into_result()?;

    // Replacement order: write the new file, update the row, then drop the
    // old file. A failed row update removes the new file instead.
    let mut new_logo_path = None;
    if let Some(file) = logo {
        let path = storage::build_storage_path(
            FileCategory::ClientLogos,
            &file.original_name,
            Utc::now(),
        );
        state.files.put(&path, file.bytes.clone()).await?;
        new_logo_path = Some(path);
    }

    let logo_path_for_row = new_logo_path.clone().or_else(|| existing.logo_path.clone());
    let updated = conn.transaction::<_, AppError, _>(|conn| {
        diesel::update(clients::table.find(id))
            .set((
                clients::name.eq(&name),
                clients::logo_path.eq(&logo_path_for_row),
            ))
            .execute(conn)?;
        if let Some(inputs) = &contact_inputs {
            diesel::delete(contact_people::table.filter(contact_people::client_id.eq(id)))
                .execute(conn)?;
            insert_contacts(conn, id, inputs)?;
        }
        Ok(())
    });

    match updated {
        Ok(()) => {
            if new_logo_path.is_some() {
                if let Some(old) = existing.logo_path {
                    let _ = state.files.delete(&old).await;
                }
            }
        }
        Err(err) => {
            if let Some(path) = new_logo_path {
                let _ = state.files.delete(&path).await;
            }
            return Err(err);
        }
    }

    let client: Client = clients::table.find(id).first(&mut conn)?;
    let contacts: Vec<ContactPerson> = ContactPerson::belonging_to(&client).load(&mut conn)?;
    Ok(response::ok(
        to_response(&state, client, contacts),
        "client updated successfully",
    ))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    let mut conn = state.db()?;
    let client: Client = clients::table.find(id).first(&mut conn)?;

    diesel::delete(clients::table.find(id)).execute(&mut conn)?;

    if let Some(logo) = client.logo_path {
        let _ = state.files.delete(&logo).await;
    }

    tracing::info!(client_id = %id, "client deleted");
    Ok(response::message_only("client deleted successfully"))
}

fn parse_contacts(form: &FormData, errors: &mut ValidationErrors) -> AppResult<Vec<ContactInput>> {
    let Some(raw) = form.json_value("contacts")? else {
        return Ok(Vec::new());
    };
    let inputs: Vec<ContactInput> = match serde_json::from_value(raw) {
        Ok(inputs) => inputs,
        Err(err) => {
            errors.add("contacts", format!("contacts must be an array of objects: {err}"));
            return Ok(Vec::new());
        }
    };
    for (index, contact) in inputs.iter().enumerate() {
        if contact.name.trim().is_empty() {
            errors.add(
                &format!("contacts.{index}.name"),
                "contact name is required",
            );
        }
    }
    Ok(inputs)
}

fn insert_contacts(
    conn: &mut diesel::PgConnection,
    client_id: Uuid,
    inputs: &[ContactInput],
) -> Result<(), diesel::result::Error> {
    let rows: Vec<NewContactPerson> = inputs
        .iter()
        .map(|input| NewContactPerson {
            id: Uuid::new_v4(),
            client_id,
            name: input.name.trim().to_string(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            position: input.position.clone(),
        })
        .collect();
    diesel::insert_into(contact_people::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

fn to_response(state: &AppState, client: Client, contacts: Vec<ContactPerson>) -> ClientResponse {
    let logo_url = client
        .logo_path
        .as_deref()
        .map(|path| state.config.public_file_url(path));
    ClientResponse {
        client,
        logo_url,
        contacts,
    }
}
