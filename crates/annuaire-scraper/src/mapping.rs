//! Mapping from directory records to storage rows.

use annuaire_client::ProviderRecord;
use annuaire_db::NewProvider;

/// Convert a decoded directory record into a provider row for `city_id`.
///
/// Absent fields stay `None`; an absent `carteVitale` means the card is not accepted.
#[must_use]
pub fn to_new_provider(record: &ProviderRecord, city_id: i64) -> NewProvider {
    NewProvider {
        first_name: record.first_name.clone(),
        last_name: record.last_name.clone(),
        specialty: record.specialty_label().map(str::to_string),
        address: record.street.clone(),
        office_name: record.complement.clone(),
        city: record.town.clone(),
        postal_code: record.postal_code.clone(),
        city_id,
        latitude: record.latitude(),
        longitude: record.longitude(),
        phone_number: record.phone().map(str::to_string),
        vitale_card: record.vitale_card.unwrap_or(false),
    }
}
