//! Value model behavior from the perspective of a caller building a
//! request (parameters dictionary, structure inspection) rather than the
//! unit-level variant-reset checks already covered inline in `src/value.rs`.

use bolt_core::value::Value;

#[test]
fn parameters_dictionary_is_built_positionally_then_looked_up_by_key() {
    let mut params = Value::Null;
    params.to_dictionary(2);
    params.set_key(0, "name").unwrap();
    *params.dict_value_mut(0).unwrap() = Value::String(b"Alice".to_vec());
    params.set_key(1, "age").unwrap();
    *params.dict_value_mut(1).unwrap() = Value::Int64(33);

    assert_eq!(params.dict_get("name").unwrap().unwrap().as_bytes().unwrap(), b"Alice");
    assert_eq!(params.dict_get("age").unwrap().unwrap().as_int64().unwrap(), 33);
    assert!(params.dict_get("missing").unwrap().is_none());
}

#[test]
fn resizing_a_list_default_initializes_new_slots_to_null() {
    let mut v = Value::Null;
    v.to_list(2);
    v.as_list_mut().unwrap()[0] = Value::Int64(1);
    v.to_list(4);
    let list = v.as_list().unwrap();
    assert_eq!(list.len(), 4);
    assert_eq!(list[0], Value::Null); // to_list always resets, not a resize
}

#[test]
fn structure_array_rows_share_one_type_code() {
    let mut v = Value::Null;
    v.to_structure_array(0x4E, 2);
    assert_eq!(v.structure_code().unwrap(), 0x4E);
    assert_eq!(v.size(), 2);
}
