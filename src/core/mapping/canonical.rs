//! Maps legacy stock tables onto the product import schema.
//!
//! Each output column is resolved from an ordered list of source field names
//! seen in the wild. The most specific convention (Visual FoxPro `ST*`
//! columns) comes first and generic fallbacks last; the order matters and
//! should not be "cleaned up".

use super::RowMapper;
use crate::core::coerce::{format_price, is_blank, normalize_value, parse_boolish, parse_numberish, slugify};
use crate::core::keymap::KeyMap;
use crate::domain::model::{canonical_headers, CanonicalRow, Record};

const SKU_FIELDS: &[&str] = &[
    "STCODIGO",
    "stcodigo",
    "CODIGO",
    "codigo",
    "COD",
    "cod",
    "SKU",
    "sku",
    "PRODUCT_CODE",
    "product_code",
];

const NAME_FIELDS: &[&str] = &[
    "STDESCRIP",
    "stdescrip",
    "DESCRIP",
    "descrip",
    "DESCRIPCION",
    "descripcion",
    "NOMBRE",
    "nombre",
    "NAME",
    "name",
    "PRODUCT_NAME",
];

const DESCRIPTION_FIELDS: &[&str] = &[
    "STDETALLE",
    "stdetalle",
    "DETALLE",
    "detalle",
    "STDESCRIP",
    "stdescrip",
    "DESCRIPCION_LARGA",
    "DESCRIPTION",
];

// STPRECUNI2 is the selling price in the FoxPro stock tables
const REGULAR_PRICE_FIELDS: &[&str] = &[
    "STPRECUNI2",
    "stprecuni2",
    "PRECUNI2",
    "precuni2",
    "PRECIO",
    "precio",
    "PRECIO_VENTA",
    "precio_venta",
    "PRICE",
    "price",
    "REGULAR_PRICE",
    "STPRECIO",
    "stprecio",
    "PRECIOVTA",
    "preciovta",
];

// No known stock table carries an offer price yet; these are the names the
// import template and the console use for it.
const SALE_PRICE_FIELDS: &[&str] = &[
    "STPRECOFE",
    "PRECIO_OFERTA",
    "precio_oferta",
    "OFERTA",
    "SALE_PRICE",
    "sale_price",
];

const SPECIAL_PRICE_FIELDS: &[&str] = &[
    "STPRECUNI1",
    "stprecuni1",
    "PRECUNI1",
    "precuni1",
    "COSTO",
    "costo",
    "COST",
    "PRECIO_ESPECIAL",
];

const FAMILY_NAME_FIELDS: &[&str] = &[
    "STNOMFAM",
    "stnomfam",
    "NOMFAM",
    "nomfam",
    "FAMILIA_NOMBRE",
    "CATEGORY_NAME",
    "CATEGORIA",
    "categoria",
];

const FAMILY_CODE_FIELDS: &[&str] = &[
    "STFAMILIA",
    "stfamilia",
    "FAMILIA",
    "familia",
    "CATEGORY",
    "category",
    "CAT",
    "cat",
];

const DELETED_FLAG_FIELDS: &[&str] = &["STBORRAR", "stborrar", "BORRAR", "borrar", "DELETED", "deleted"];

/// First candidate with a non-blank value, trimmed.
pub fn pick_str(record: &Record, keys: &KeyMap, fields: &[&str]) -> String {
    fields
        .iter()
        .filter_map(|field| keys.get_value_by_field(record, field))
        .find(|value| !is_blank(value))
        .map(normalize_value)
        .unwrap_or_default()
}

/// First candidate that parses as a number.
pub fn pick_num(record: &Record, keys: &KeyMap, fields: &[&str]) -> Option<f64> {
    fields
        .iter()
        .filter_map(|field| keys.get_value_by_field(record, field))
        .find_map(parse_numberish)
}

/// Discounts only make sense when positive and below the regular price.
fn discount_price(candidate: Option<f64>, regular: Option<f64>) -> String {
    match (candidate, regular) {
        (Some(price), Some(regular)) if price > 0.0 && price < regular => format_price(Some(price)),
        _ => String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct CanonicalMapper {
    keys: KeyMap,
}

impl CanonicalMapper {
    pub fn new(keys: KeyMap) -> Self {
        Self { keys }
    }

    pub fn from_sample(sample: &Record) -> Self {
        Self::new(KeyMap::build(sample))
    }

    pub fn key_map(&self) -> &KeyMap {
        &self.keys
    }

    pub fn map_record(&self, record: &Record) -> CanonicalRow {
        let keys = &self.keys;

        let sku = pick_str(record, keys, SKU_FIELDS);
        let name = pick_str(record, keys, NAME_FIELDS);
        let mut description = pick_str(record, keys, DESCRIPTION_FIELDS);
        if description.is_empty() {
            description = name.clone();
        }

        let regular = pick_num(record, keys, REGULAR_PRICE_FIELDS);
        let sale = pick_num(record, keys, SALE_PRICE_FIELDS);
        let special = pick_num(record, keys, SPECIAL_PRICE_FIELDS);

        let family_name = slugify(&pick_str(record, keys, FAMILY_NAME_FIELDS));
        let category_slug = if family_name.is_empty() {
            slugify(&pick_str(record, keys, FAMILY_CODE_FIELDS))
        } else {
            family_name
        };

        // 刪除標記：無法判斷時預設為啟用
        let deleted = DELETED_FLAG_FIELDS
            .iter()
            .filter_map(|field| keys.get_value_by_field(record, field))
            .find_map(parse_boolish);
        let is_active = !deleted.unwrap_or(false);

        CanonicalRow {
            sku,
            name,
            description,
            regular_price: format_price(regular),
            sale_price: discount_price(sale, regular),
            special_price: discount_price(special, regular),
            category_slug,
            is_active: is_active.to_string(),
            ..CanonicalRow::default()
        }
    }
}

impl RowMapper for CanonicalMapper {
    fn header(&self) -> Vec<String> {
        canonical_headers()
    }

    fn map_row(&self, record: &Record) -> Vec<String> {
        self.map_record(record).into_columns().into()
    }
}
