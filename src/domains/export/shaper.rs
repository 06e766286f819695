use crate::domains::car_listing::CarListing;
use crate::domains::export::fields::{includes, FieldSpec, MAIN_IMAGE};
use crate::domains::export::repository::ExportRepository;
use crate::domains::export::types::{ExportValue, ShapedRecord};
use crate::domains::user::User;
use crate::errors::DomainResult;
use crate::types::format_timestamp;

/// An entity that can be flattened into export cells
pub trait ExportRow {
    /// Value of one allow-listed field; `None` for names the entity does not carry
    fn field_value(&self, name: &str) -> Option<ExportValue>;
}

impl ExportRow for CarListing {
    fn field_value(&self, name: &str) -> Option<ExportValue> {
        let value = match name {
            "id" => ExportValue::Integer(self.id),
            "title" => ExportValue::text(&self.title),
            "make" => ExportValue::text(&self.make),
            "model" => ExportValue::text(&self.model),
            "year" => ExportValue::text(&self.year),
            "body_type" => ExportValue::text(&self.body_type),
            "fuel_type" => ExportValue::text(&self.fuel_type),
            "kilometers" => ExportValue::Integer(self.kilometers),
            "horsepower" => ExportValue::text(&self.horsepower),
            "exterior_color" => ExportValue::text(&self.exterior_color),
            "price_formatted" => ExportValue::text(&self.price_formatted),
            "currency" => ExportValue::text(&self.currency),
            "location" => ExportValue::text(&self.location),
            "phone" => ExportValue::text(&self.phone),
            "seller_name" => ExportValue::text(&self.seller_name),
            "seller_type" => ExportValue::text(&self.seller_type),
            "short_url" => ExportValue::text(&self.short_url),
            "status" => ExportValue::optional_text(self.status.as_deref()),
            "created_at" => ExportValue::text(format_timestamp(&self.created_at)),
            "updated_at" => ExportValue::text(format_timestamp(&self.updated_at)),
            _ => return None,
        };
        Some(value)
    }
}

impl ExportRow for User {
    fn field_value(&self, name: &str) -> Option<ExportValue> {
        let value = match name {
            "id" => ExportValue::Integer(self.id),
            "email" => ExportValue::text(&self.email),
            "firstName" => ExportValue::text(&self.first_name),
            "lastName" => ExportValue::text(&self.last_name),
            "phone" => ExportValue::optional_text(self.phone.as_deref()),
            "role" => ExportValue::text(self.role.as_str()),
            "bio" => ExportValue::optional_text(self.bio.as_deref()),
            "created_at" => ExportValue::text(format_timestamp(&self.created_at)),
            "updated_at" => ExportValue::text(format_timestamp(&self.updated_at)),
            _ => return None,
        };
        Some(value)
    }
}

fn shape_row<T: ExportRow>(row: &T, fields: &[FieldSpec], main_image: Option<&str>) -> ShapedRecord {
    let mut record = ShapedRecord::with_capacity(fields.len());
    for field in fields {
        let value = if field.name == MAIN_IMAGE {
            ExportValue::optional_text(main_image)
        } else {
            row.field_value(field.name).unwrap_or_else(ExportValue::empty)
        };
        record.push(field.name, value);
    }
    record
}

/// Shape listings, resolving `main_image` with a single batched lookup
pub async fn shape_cars(
    rows: &[CarListing],
    fields: &[FieldSpec],
    repo: &dyn ExportRepository,
) -> DomainResult<Vec<ShapedRecord>> {
    if rows.is_empty() || !includes(fields, MAIN_IMAGE) {
        return Ok(rows.iter().map(|row| shape_row(row, fields, None)).collect());
    }

    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let photos = repo.first_photos(&ids).await?;

    Ok(rows
        .iter()
        .map(|row| shape_row(row, fields, photos.get(&row.id).map(String::as_str)))
        .collect())
}

pub fn shape_users(rows: &[User], fields: &[FieldSpec]) -> Vec<ShapedRecord> {
    rows.iter().map(|row| shape_row(row, fields, None)).collect()
}
