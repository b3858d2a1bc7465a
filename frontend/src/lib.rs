use seed::{prelude::*, virtual_dom::AtValue, *};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_wasm_bindgen::to_value;
use shared::{Item, LatLng, NewPoint};
use wasm_bindgen::{
    JsCast,
    prelude::{JsValue, wasm_bindgen},
};

#[wasm_bindgen(module = "/leaflet_map.js")]
extern "C" {
    #[wasm_bindgen(js_name = initMap)]
    fn init_map();
    #[wasm_bindgen(js_name = centerMap)]
    fn center_map(position: JsValue);
    #[wasm_bindgen(js_name = updateMarker)]
    fn update_marker(position: JsValue);
    #[wasm_bindgen(js_name = requestGeolocation)]
    fn request_geolocation();
}

fn api_root() -> String {
    if let Some(url) = option_env!("FRONTEND_API_ROOT") {
        return url.trim_end_matches('/').to_string();
    }
    "http://localhost:8080/api".to_string()
}

const IBGE_ROOT: &str = "https://servicodados.ibge.gov.br/api/v1/localidades";

/// Placeholder value of the UF/city selects, converted to `None` at the
/// message boundary.
const UNSELECTED: &str = "0";

pub struct Model {
    items: Vec<Item>,
    ufs: Vec<String>,
    cities: Vec<String>,
    selected_uf: Option<String>,
    selected_city: Option<String>,
    selected_items: Vec<i64>,
    initial_position: LatLng,
    selected_position: LatLng,
    form: ContactForm,
    pending: bool,
    error: Option<String>,
}

#[derive(Default, Clone)]
struct ContactForm {
    name: String,
    email: String,
    whatsapp: String,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Field {
    Name,
    Email,
    Whatsapp,
}

impl ContactForm {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = value,
            Field::Email => self.email = value,
            Field::Whatsapp => self.whatsapp = value,
        }
    }
}

pub enum Msg {
    MapReady,
    PositionResolved(LatLng),
    ItemsFetched(Result<Vec<Item>, String>),
    UfsFetched(Result<Vec<String>, String>),
    CitiesFetched(Result<Vec<String>, String>),
    UfSelected(String),
    CitySelected(String),
    FieldChanged(Field, String),
    ItemToggled(i64),
    MapClicked(LatLng),
    Submit,
    PointCreated(Result<(), String>),
}

pub fn init(_: Url, orders: &mut impl Orders<Msg>) -> Model {
    orders.stream(streams::window_event(Ev::from("map-click"), |event| {
        Msg::MapClicked(event_coordinate(event))
    }));
    orders.stream(streams::window_event(
        Ev::from("device-position"),
        |event| Msg::PositionResolved(event_coordinate(event)),
    ));

    // Leaflet can only mount once the view has rendered the #map container.
    orders.after_next_render(|_| Msg::MapReady);

    orders.perform_cmd(fetch_items());
    orders.perform_cmd(fetch_ufs());
    // One-shot geolocation query; resolution arrives as a device-position
    // event. A denial dispatches nothing and the default position stands.
    request_geolocation();

    Model {
        items: Vec::new(),
        ufs: Vec::new(),
        cities: Vec::new(),
        selected_uf: None,
        selected_city: None,
        selected_items: Vec::new(),
        initial_position: LatLng::default(),
        selected_position: LatLng::default(),
        form: ContactForm::default(),
        pending: false,
        error: None,
    }
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::MapReady => init_map(),
        Msg::PositionResolved(position) => {
            model.initial_position = position;
            if let Ok(position_js) = to_value(&position) {
                center_map(position_js);
            }
        }
        Msg::ItemsFetched(result) => match result {
            Ok(items) => model.items = items,
            Err(err) => log_fetch_error("items", &err),
        },
        Msg::UfsFetched(result) => match result {
            Ok(ufs) => model.ufs = ufs,
            Err(err) => log_fetch_error("estados", &err),
        },
        Msg::CitiesFetched(result) => match result {
            Ok(cities) => model.cities = cities,
            Err(err) => log_fetch_error("municipios", &err),
        },
        Msg::UfSelected(value) => {
            model.selected_uf = parse_selection(&value);
            model.selected_city = None;
            match city_request_url(model.selected_uf.as_deref()) {
                Some(url) => {
                    orders.perform_cmd(fetch_cities(url));
                }
                None => model.cities.clear(),
            }
        }
        Msg::CitySelected(value) => {
            model.selected_city = parse_selection(&value);
        }
        Msg::FieldChanged(field, value) => {
            model.form.set(field, value);
        }
        Msg::ItemToggled(id) => {
            toggle_item(&mut model.selected_items, id);
        }
        Msg::MapClicked(position) => {
            model.selected_position = position;
            if let Ok(position_js) = to_value(&position) {
                update_marker(position_js);
            }
        }
        Msg::Submit => {
            if model.pending {
                return;
            }
            match compose_point(
                &model.form,
                model.selected_uf.as_deref(),
                model.selected_city.as_deref(),
                model.selected_position,
                &model.selected_items,
            ) {
                Ok(payload) => {
                    model.pending = true;
                    model.error = None;
                    orders.perform_cmd(create_point(payload));
                }
                Err(err) => model.error = Some(err),
            }
        }
        Msg::PointCreated(result) => {
            model.pending = false;
            match result {
                Ok(()) => {
                    let window = window();
                    let _ = window.alert_with_message("Ponto de coleta criado!");
                    let _ = window.location().set_href("/");
                }
                Err(err) => model.error = Some(err),
            }
        }
    }
}

/// Extracts the `{lat, lng}` detail of a map shim CustomEvent, defaulting to
/// the origin when the detail is malformed.
fn event_coordinate(event: web_sys::Event) -> LatLng {
    let event = event
        .dyn_into::<web_sys::CustomEvent>()
        .expect("map shim event must be CustomEvent");
    serde_wasm_bindgen::from_value(event.detail()).unwrap_or_default()
}

fn log_fetch_error(resource: &str, err: &str) {
    web_sys::console::error_1(&format!("[frontend] failed to load {resource}: {err}").into());
}

fn parse_selection(raw: &str) -> Option<String> {
    if raw == UNSELECTED {
        None
    } else {
        Some(raw.to_string())
    }
}

/// City list endpoint for the current UF selection. No selection means no
/// request: the stale list is cleared instead.
fn city_request_url(selection: Option<&str>) -> Option<String> {
    selection.map(|uf| format!("{IBGE_ROOT}/estados/{uf}/municipios"))
}

fn toggle_item(selected: &mut Vec<i64>, id: i64) {
    if let Some(index) = selected.iter().position(|&item| item == id) {
        selected.remove(index);
    } else {
        selected.push(id);
    }
}

fn uf_codes(states: Vec<UfPayload>) -> Vec<String> {
    let mut codes: Vec<String> = states.into_iter().map(|state| state.sigla).collect();
    codes.sort();
    codes
}

fn city_names(cities: Vec<CityPayload>) -> Vec<String> {
    cities.into_iter().map(|city| city.nome).collect()
}

fn compose_point(
    form: &ContactForm,
    uf: Option<&str>,
    city: Option<&str>,
    position: LatLng,
    items: &[i64],
) -> Result<NewPoint, String> {
    let uf = uf.ok_or_else(|| "Selecione uma UF".to_string())?;
    let city = city.ok_or_else(|| "Selecione uma cidade".to_string())?;
    Ok(NewPoint {
        name: form.name.clone(),
        email: form.email.clone(),
        whatsapp: form.whatsapp.clone(),
        uf: uf.to_string(),
        city: city.to_string(),
        latitude: position.lat,
        longitude: position.lng,
        items: items.to_vec(),
    })
}

async fn fetch_items() -> Msg {
    Msg::ItemsFetched(get_json::<Vec<Item>>(format!("{}/items", api_root())).await)
}

async fn fetch_ufs() -> Msg {
    let result = get_json::<Vec<UfPayload>>(format!("{IBGE_ROOT}/estados"))
        .await
        .map(uf_codes);
    Msg::UfsFetched(result)
}

async fn fetch_cities(url: String) -> Msg {
    let result = get_json::<Vec<CityPayload>>(url).await.map(city_names);
    Msg::CitiesFetched(result)
}

async fn get_json<T: DeserializeOwned + 'static>(url: String) -> Result<T, String> {
    let request = Request::new(url).method(Method::Get);
    match request.fetch().await {
        Err(err) => Err(format!("{err:?}")),
        Ok(raw) => match raw.check_status() {
            Err(status_err) => Err(format!("{status_err:?}")),
            Ok(resp) => match resp.json::<T>().await {
                Ok(payload) => Ok(payload),
                Err(err) => Err(format!("{err:?}")),
            },
        },
    }
}

async fn create_point(payload: NewPoint) -> Msg {
    web_sys::console::debug_1(
        &format!(
            "[frontend] creating collection point uf={} city={} items={:?}",
            payload.uf, payload.city, payload.items
        )
        .into(),
    );
    let result = match Request::new(format!("{}/points", api_root()))
        .method(Method::Post)
        .json(&payload)
    {
        Err(err) => Err(format!("{err:?}")),
        Ok(request) => match request.fetch().await {
            Err(err) => Err(format!("{err:?}")),
            Ok(raw) => match raw.check_status() {
                Err(status_err) => Err(format!("{status_err:?}")),
                Ok(_) => Ok(()),
            },
        },
    };

    Msg::PointCreated(result)
}

pub fn view(model: &Model) -> Node<Msg> {
    let header = header![
        C!["page-header"],
        strong!["Ecoleta"],
        a![attrs! { At::Href => "/" }, "Voltar para home"],
    ];

    div![C!["page-create-point"], header, view_form(model)]
}

fn view_form(model: &Model) -> Node<Msg> {
    form![
        h1!["Cadastro do ponto de coleta"],
        view_contact_fields(&model.form),
        view_address(model),
        view_items(model),
        button![
            "Cadastrar ponto de coleta",
            ev(Ev::Click, |event| {
                event.prevent_default();
                Msg::Submit
            }),
            attrs! { At::Type => "submit", At::Disabled => bool_attr(model.pending) },
        ],
        if let Some(error) = &model.error {
            p![C!["error"], error]
        } else {
            empty![]
        }
    ]
}

fn view_contact_fields(form: &ContactForm) -> Node<Msg> {
    let input_field = |label_text: &str, name: &str, input_type: &str, value: &str, field: Field| {
        div![
            C!["field"],
            label![attrs! { At::For => name }, label_text],
            input![
                attrs! {
                    At::Type => input_type,
                    At::Name => name,
                    At::Id => name,
                    At::Value => value,
                    At::AutoComplete => "off",
                },
                input_ev(Ev::Input, move |value| Msg::FieldChanged(field, value)),
            ]
        ]
    };

    fieldset![
        legend![h2!["Dados"]],
        input_field("Nome da entidade", "name", "text", &form.name, Field::Name),
        div![
            C!["field-group"],
            input_field("E-mail", "email", "email", &form.email, Field::Email),
            input_field("Whatsapp", "whatsapp", "text", &form.whatsapp, Field::Whatsapp),
        ],
    ]
}

fn view_address(model: &Model) -> Node<Msg> {
    fieldset![
        legend![h2!["Endereço"], span!["Selecione o endereço no mapa"]],
        // The Leaflet map mounts into this container from leaflet_map.js;
        // clicks come back as map-click CustomEvents.
        div![attrs! { At::Id => "map" }],
        div![
            C!["field-group"],
            view_select(
                "UF",
                "uf",
                "Selecione uma UF",
                &model.ufs,
                model.selected_uf.as_deref(),
                Msg::UfSelected,
            ),
            view_select(
                "Cidade",
                "city",
                "Selecione uma cidade",
                &model.cities,
                model.selected_city.as_deref(),
                Msg::CitySelected,
            ),
        ],
    ]
}

fn view_select(
    label_text: &str,
    name: &str,
    placeholder: &str,
    options: &[String],
    selected: Option<&str>,
    msg: fn(String) -> Msg,
) -> Node<Msg> {
    div![
        C!["field"],
        label![attrs! { At::For => name }, label_text],
        select![
            attrs! {
                At::Name => name,
                At::Id => name,
                At::Value => selected.unwrap_or(UNSELECTED),
            },
            option![attrs! { At::Value => UNSELECTED }, placeholder],
            options.iter().map(|option_value| {
                option![
                    attrs! {
                        At::Value => option_value,
                        At::Selected => bool_attr(selected == Some(option_value.as_str())),
                    },
                    option_value
                ]
            }),
            input_ev(Ev::Change, msg),
        ]
    ]
}

fn view_items(model: &Model) -> Node<Msg> {
    fieldset![
        legend![h2!["Ítens de coleta"], span!["Selecione um ou mais ítens abaixo"]],
        ul![
            C!["items-grid"],
            model.items.iter().map(|item| {
                let id = item.id;
                let selected = model.selected_items.contains(&id);
                li![
                    C![IF!(selected => "selected")],
                    img![attrs! { At::Src => item.image_url, At::Alt => item.title }],
                    span![&item.title],
                    ev(Ev::Click, move |_| Msg::ItemToggled(id)),
                ]
            })
        ],
    ]
}

fn bool_attr(value: bool) -> AtValue {
    if value {
        AtValue::Some("true".into())
    } else {
        AtValue::Ignored
    }
}

#[derive(Deserialize)]
struct UfPayload {
    sigla: String,
}

#[derive(Deserialize)]
struct CityPayload {
    nome: String,
}

#[wasm_bindgen(start)]
pub fn start() {
    App::start("app", init, update, view);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_toggle_item_twice_restores_selection() {
        let mut selected = vec![1, 3];

        toggle_item(&mut selected, 2);
        assert!(selected.contains(&2));

        toggle_item(&mut selected, 2);
        assert_eq!(selected, vec![1, 3]);
    }

    #[test]
    fn test_toggle_item_removes_regardless_of_position() {
        let mut selected = vec![5, 1, 3];
        toggle_item(&mut selected, 1);
        assert_eq!(selected, vec![5, 3]);
    }

    #[test]
    fn test_parse_selection_sentinel_is_none() {
        assert_eq!(parse_selection("0"), None);
        assert_eq!(parse_selection("SP"), Some("SP".to_string()));
    }

    #[test]
    fn test_sentinel_selection_issues_no_city_request() {
        assert_eq!(city_request_url(parse_selection("0").as_deref()), None);
    }

    #[test]
    fn test_uf_selection_requests_cities_scoped_to_it() {
        assert_eq!(
            city_request_url(parse_selection("SP").as_deref()),
            Some(format!("{IBGE_ROOT}/estados/SP/municipios"))
        );
    }

    #[test]
    fn test_uf_codes_sorted_ascending() {
        let states = vec![
            UfPayload { sigla: "RJ".into() },
            UfPayload { sigla: "AC".into() },
        ];
        assert_eq!(uf_codes(states), vec!["AC".to_string(), "RJ".to_string()]);
    }

    #[test]
    fn test_field_change_touches_only_named_field() {
        let mut form = ContactForm {
            name: "A".into(),
            email: "a@b.com".into(),
            whatsapp: "123".into(),
        };

        form.set(Field::Email, "c@d.com".into());

        assert_eq!(form.name, "A");
        assert_eq!(form.email, "c@d.com");
        assert_eq!(form.whatsapp, "123");
    }

    #[test]
    fn test_compose_point_payload_wire_format() {
        let form = ContactForm {
            name: "A".into(),
            email: "a@b.com".into(),
            whatsapp: "123".into(),
        };
        let position = LatLng { lat: -23.5, lng: -46.6 };

        let payload = compose_point(&form, Some("SP"), Some("Campinas"), position, &[1, 3])
            .expect("complete selection composes");

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "name": "A",
                "email": "a@b.com",
                "whatsapp": "123",
                "uf": "SP",
                "city": "Campinas",
                "latitude": -23.5,
                "longitude": -46.6,
                "items": [1, 3],
            })
        );
    }

    #[test]
    fn test_compose_point_requires_uf_and_city() {
        let form = ContactForm::default();
        let position = LatLng::default();

        assert!(compose_point(&form, None, None, position, &[]).is_err());
        assert!(compose_point(&form, Some("SP"), None, position, &[]).is_err());
        assert!(compose_point(&form, Some("SP"), Some("Campinas"), position, &[]).is_ok());
    }

    #[test]
    fn test_city_names_preserve_service_order() {
        let cities = vec![
            CityPayload { nome: "Campinas".into() },
            CityPayload { nome: "Americana".into() },
        ];
        assert_eq!(
            city_names(cities),
            vec!["Campinas".to_string(), "Americana".to_string()]
        );
    }

    #[test]
    fn test_latlng_event_payload_shape() {
        let payload: LatLng = serde_json::from_value(json!({ "lat": 10.0, "lng": 20.0 })).unwrap();
        assert_eq!(payload, LatLng { lat: 10.0, lng: 20.0 });
    }
}
