use crate::domains::export::types::ExportKind;
use crate::errors::{DomainError, DomainResult, ValidationError};

/// An exportable field: internal name and column header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
}

const fn field(name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec { name, label }
}

pub const MAIN_IMAGE: &str = "main_image";

/// Car listing allow-list, in default export order
pub const CAR_FIELDS: &[FieldSpec] = &[
    field("id", "ID"),
    field("title", "Название"),
    field("make", "Марка"),
    field("model", "Модель"),
    field("year", "Год"),
    field("body_type", "Тип кузова"),
    field("fuel_type", "Тип топлива"),
    field("kilometers", "Пробег"),
    field("horsepower", "Мощность"),
    field("exterior_color", "Цвет"),
    field("price_formatted", "Цена"),
    field("currency", "Валюта"),
    field("location", "Локация"),
    field("phone", "Телефон"),
    field("seller_name", "Имя продавца"),
    field("seller_type", "Тип продавца"),
    field("short_url", "URL"),
    field(MAIN_IMAGE, "Главное изображение"),
    field("status", "Статус"),
    field("created_at", "Дата создания"),
    field("updated_at", "Дата обновления"),
];

/// User allow-list, in default export order
pub const USER_FIELDS: &[FieldSpec] = &[
    field("id", "ID"),
    field("email", "Email"),
    field("firstName", "Имя"),
    field("lastName", "Фамилия"),
    field("phone", "Телефон"),
    field("role", "Роль"),
    field("bio", "Биография"),
    field("created_at", "Дата создания"),
    field("updated_at", "Дата обновления"),
];

impl ExportKind {
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            ExportKind::Cars => CAR_FIELDS,
            ExportKind::Users => USER_FIELDS,
        }
    }
}

/// Resolve a requested field list against the allow-list of `kind`.
///
/// An absent or empty list selects every field in default order. Otherwise
/// the caller's order is kept and every unknown name is reported at once.
pub fn resolve_fields(kind: ExportKind, requested: Option<&[String]>) -> DomainResult<Vec<FieldSpec>> {
    let allowed = kind.fields();
    let requested = match requested {
        Some(list) if !list.is_empty() => list,
        _ => return Ok(allowed.to_vec()),
    };

    let mut resolved = Vec::with_capacity(requested.len());
    let mut invalid = Vec::new();
    for name in requested {
        match allowed.iter().find(|field| field.name == name.as_str()) {
            Some(field) => resolved.push(*field),
            None => invalid.push(name.clone()),
        }
    }

    if !invalid.is_empty() {
        return Err(DomainError::Validation(ValidationError::InvalidFields {
            entity: kind.as_str().to_string(),
            invalid,
            allowed: allowed.iter().map(|field| field.name.to_string()).collect(),
        }));
    }

    Ok(resolved)
}

pub fn includes(fields: &[FieldSpec], name: &str) -> bool {
    fields.iter().any(|field| field.name == name)
}
