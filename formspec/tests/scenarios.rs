//! End-to-end scenarios: parse a form, poke at it, and watch what comes out
//! of the submission sink and the inventory action stream.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use euclid::{point2, vec2};
use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;

use formspec::geometry::PxPoint;
use formspec::inv::{InventoryAction, InventoryLocation, ItemStack, SlotRef, VecInventory};
use formspec::{
    Menu, MenuSettings, PointerButton, PointerEvent, Response, StaticFormSource, TextDest,
    TextureRef, TextureSource, WidgetKind,
};

// -------------------------------------------------------------------------------------------------

/// Submission sink that keeps every field map it receives.
#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<BTreeMap<String, String>>>>);

impl Recorder {
    fn last(&self) -> BTreeMap<String, String> {
        self.0.borrow().last().cloned().unwrap_or_default()
    }
    fn count(&self) -> usize {
        self.0.borrow().len()
    }
}

impl TextDest for Recorder {
    fn submit(&mut self, fields: &BTreeMap<String, String>) {
        self.0.borrow_mut().push(fields.clone());
    }
}

const SCREEN: euclid::Size2D<f32, formspec::geometry::Px> =
    euclid::Size2D::new(1280.0, 720.0);

fn menu_with(form: &str) -> (Menu, Recorder) {
    let recorder = Recorder::default();
    let mut menu = Menu::new(
        Box::new(StaticFormSource::new(form)),
        Box::new(recorder.clone()),
        MenuSettings::default(),
    );
    menu.regenerate(SCREEN);
    (menu, recorder)
}

fn field_center(menu: &Menu, name: &str) -> PxPoint {
    let field = menu.field(name).unwrap();
    menu.arena().absolute_rect(field.widget.unwrap()).center()
}

/// Center of the `n`-th slot of the `list_index`-th inventory list widget.
fn slot_center(menu: &Menu, list_index: usize, n: u32) -> PxPoint {
    let mut seen = 0;
    for id in menu.arena().ids() {
        if let WidgetKind::List(list) = &menu.arena().get(id).kind {
            if seen == list_index {
                let abs = menu.arena().absolute_rect(id);
                return abs.min + list.slot_rect(n).center().to_vector();
            }
            seen += 1;
        }
    }
    panic!("list widget {list_index} not found");
}

fn press(
    menu: &mut Menu,
    inv: &mut VecInventory,
    pos: PxPoint,
    button: PointerButton,
) -> Response {
    menu.pointer_event(
        PointerEvent::Pressed {
            pos,
            button,
            shift: false,
        },
        inv,
    )
}

fn shift_press(menu: &mut Menu, inv: &mut VecInventory, pos: PxPoint, button: PointerButton) {
    menu.pointer_event(
        PointerEvent::Pressed {
            pos,
            button,
            shift: true,
        },
        inv,
    );
}

/// A full left click: press then release at the same point.
fn tap(menu: &mut Menu, inv: &mut VecInventory, pos: PxPoint) -> Response {
    press(menu, inv, pos, PointerButton::Left);
    menu.pointer_event(
        PointerEvent::Released {
            pos,
            button: PointerButton::Left,
        },
        inv,
    )
}

fn player_inventory(count: u32) -> VecInventory {
    let mut inv = VecInventory::new();
    let mut stacks = vec![ItemStack::empty(); 32];
    stacks[0] = ItemStack::new("dirt", count);
    stacks[2] = ItemStack::new("stone", 99);
    inv.set_list(InventoryLocation::CurrentPlayer, "main", stacks);
    inv
}

fn main_slot(index: usize) -> SlotRef {
    SlotRef::new(InventoryLocation::CurrentPlayer, "main", index)
}

// -------------------------------------------------------------------------------------------------

#[test]
fn button_click_submits_label() {
    let (mut menu, recorder) = menu_with("size[3,1]button[0,0;2,1;ok;OK]");
    let mut inv = VecInventory::new();
    let pos = field_center(&menu, "ok");
    let response = tap(&mut menu, &mut inv, pos);
    assert_eq!(response, Response::Consumed);
    assert_eq!(
        recorder.last(),
        BTreeMap::from([("ok".to_owned(), "OK".to_owned())]),
    );
}

#[test]
fn exit_button_closes_with_quit() {
    let (mut menu, recorder) = menu_with("size[3,1]button_exit[0,0;2,1;done;Done]");
    let mut inv = VecInventory::new();
    let pos = field_center(&menu, "done");
    let response = tap(&mut menu, &mut inv, pos);
    assert_eq!(response, Response::Close);
    let map = recorder.last();
    assert_eq!(map.get("done").map(String::as_str), Some("Done"));
    assert_eq!(map.get("quit").map(String::as_str), Some("true"));
}

#[test]
fn escape_cancels_with_only_quit() {
    let (mut menu, recorder) = menu_with("size[3,1]button[0,0;2,1;ok;OK]");
    assert_eq!(menu.key_event(formspec::Key::Escape), Response::Close);
    assert_eq!(
        recorder.last(),
        BTreeMap::from([("quit".to_owned(), "true".to_owned())]),
    );
}

#[test]
fn checkbox_click_toggles_and_submits() {
    let (mut menu, recorder) = menu_with("size[4,2]checkbox[0,1;opt;Enable;false]");
    let mut inv = VecInventory::new();
    let pos = field_center(&menu, "opt");
    tap(&mut menu, &mut inv, pos);
    assert_eq!(recorder.last().get("opt").map(String::as_str), Some("true"));
    tap(&mut menu, &mut inv, pos);
    assert_eq!(recorder.last().get("opt").map(String::as_str), Some("false"));
}

// -------------------------------------------------------------------------------------------------

#[test]
fn list_produces_a_32_slot_grid() {
    let (menu, _) = menu_with("size[10,6]list[current_player;main;0,0;8,4]");
    let list = menu
        .arena()
        .ids()
        .find_map(|id| match &menu.arena().get(id).kind {
            WidgetKind::List(list) => Some(list.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!((list.cols, list.rows), (8, 4));
    assert_eq!(list.slot_count(), 32);
    assert_eq!(list.list, "main");
    assert_eq!(list.location, InventoryLocation::CurrentPlayer);
}

#[rstest]
#[case(PointerButton::Left, 10)]
#[case(PointerButton::Right, 5)]
#[case(PointerButton::Middle, 10)]
#[case(PointerButton::WheelDown, 1)]
fn pick_up_amounts(#[case] button: PointerButton, #[case] expected: u32) {
    let (mut menu, _) = menu_with("size[10,6]list[current_player;main;0,0;8,4]");
    let mut inv = player_inventory(10);
    let pos = slot_center(&menu, 0, 0);
    press(&mut menu, &mut inv, pos, button);
    assert_eq!(menu.selected(), Some((main_slot(0), expected)));
    assert!(inv.actions.is_empty(), "pick-up must not move anything yet");
}

#[test]
fn place_one_then_rest() {
    let (mut menu, _) = menu_with("size[10,6]list[current_player;main;0,0;8,4]");
    let mut inv = player_inventory(10);
    let src = slot_center(&menu, 0, 0);
    press(&mut menu, &mut inv, src, PointerButton::Left);

    // Right-click places a single item into an empty slot.
    let target = slot_center(&menu, 0, 1);
    press(&mut menu, &mut inv, target, PointerButton::Right);
    assert_eq!(
        inv.actions,
        vec![InventoryAction::Move {
            count: 1,
            from: main_slot(0),
            to: main_slot(1),
            move_somewhere: false,
        }],
    );
    assert_eq!(menu.selected(), Some((main_slot(0), 9)));

    // Left-click places the remainder.
    let rest = slot_center(&menu, 0, 3);
    press(&mut menu, &mut inv, rest, PointerButton::Left);
    assert_eq!(menu.selected(), None);
    assert_eq!(
        inv.actions.last(),
        Some(&InventoryAction::Move {
            count: 9,
            from: main_slot(0),
            to: main_slot(3),
            move_somewhere: false,
        }),
    );
}

#[test]
fn placing_on_a_full_different_stack_keeps_holding() {
    let (mut menu, _) = menu_with("size[10,6]list[current_player;main;0,0;8,4]");
    let mut inv = player_inventory(10);
    let src = slot_center(&menu, 0, 0);
    let full = slot_center(&menu, 0, 2);
    press(&mut menu, &mut inv, src, PointerButton::Left);
    // Slot 2 holds 99 stone; no room for dirt.
    press(&mut menu, &mut inv, full, PointerButton::Left);
    assert!(inv.actions.is_empty());
    assert_eq!(menu.selected(), Some((main_slot(0), 10)));
}

#[test]
fn clicking_the_source_slot_deselects() {
    let (mut menu, _) = menu_with("size[10,6]list[current_player;main;0,0;8,4]");
    let mut inv = player_inventory(10);
    let src = slot_center(&menu, 0, 0);
    press(&mut menu, &mut inv, src, PointerButton::Left);
    menu.pointer_event(
        PointerEvent::Released {
            pos: src,
            button: PointerButton::Left,
        },
        &mut inv,
    );
    assert!(menu.selected().is_some());
    press(&mut menu, &mut inv, src, PointerButton::Left);
    assert_eq!(menu.selected(), None);
    assert!(inv.actions.is_empty());
}

#[test]
fn wheel_adjusts_the_selected_amount() {
    let (mut menu, _) = menu_with("size[10,6]list[current_player;main;0,0;8,4]");
    let mut inv = player_inventory(10);
    let src = slot_center(&menu, 0, 0);
    press(&mut menu, &mut inv, src, PointerButton::WheelDown);
    press(&mut menu, &mut inv, src, PointerButton::WheelDown);
    assert_eq!(menu.selected(), Some((main_slot(0), 2)));
    press(&mut menu, &mut inv, src, PointerButton::WheelUp);
    press(&mut menu, &mut inv, src, PointerButton::WheelUp);
    assert_eq!(menu.selected(), None);
}

#[test]
fn drag_moves_the_whole_selection() {
    let (mut menu, _) = menu_with("size[10,6]list[current_player;main;0,0;8,4]");
    let mut inv = player_inventory(10);
    let src = slot_center(&menu, 0, 0);
    press(&mut menu, &mut inv, src, PointerButton::Left);
    let target = slot_center(&menu, 0, 5);
    menu.pointer_event(PointerEvent::Moved { pos: target }, &mut inv);
    menu.pointer_event(
        PointerEvent::Released {
            pos: target,
            button: PointerButton::Left,
        },
        &mut inv,
    );
    assert_eq!(
        inv.actions,
        vec![InventoryAction::Move {
            count: 10,
            from: main_slot(0),
            to: main_slot(5),
            move_somewhere: false,
        }],
    );
    assert_eq!(menu.selected(), None);
}

#[test]
fn click_outside_drops_the_selection() {
    let (mut menu, _) = menu_with("size[10,6]list[current_player;main;0,0;8,4]");
    let mut inv = player_inventory(10);
    let src = slot_center(&menu, 0, 0);
    press(&mut menu, &mut inv, src, PointerButton::Left);
    let outside = point2(1.0, 1.0);
    assert_eq!(
        press(&mut menu, &mut inv, outside, PointerButton::Right),
        Response::Consumed,
    );
    assert_eq!(
        inv.actions,
        vec![InventoryAction::Drop {
            count: 1,
            from: main_slot(0),
        }],
    );
    assert_eq!(menu.selected(), Some((main_slot(0), 9)));
    press(&mut menu, &mut inv, outside, PointerButton::Left);
    assert_eq!(menu.selected(), None);
}

#[test]
fn shift_click_transfers_along_the_list_ring() {
    let (mut menu, _) = menu_with(indoc! {"
        size[10,9]
        list[current_player;main;0,0;8,4]
        list[current_player;craft;0,5;3,3]
        listring[]
    "});
    let mut inv = player_inventory(10);
    inv.set_list(
        InventoryLocation::CurrentPlayer,
        "craft",
        vec![ItemStack::empty(); 9],
    );

    let src = slot_center(&menu, 0, 0);
    shift_press(&mut menu, &mut inv, src, PointerButton::Left);
    assert_eq!(
        inv.actions,
        vec![InventoryAction::Move {
            count: 10,
            from: main_slot(0),
            to: SlotRef::new(InventoryLocation::CurrentPlayer, "craft", 0),
            move_somewhere: true,
        }],
    );
    assert_eq!(menu.selected(), None);

    // Shift-right-click moves a single item.
    shift_press(&mut menu, &mut inv, src, PointerButton::Right);
    assert_eq!(
        inv.actions.last(),
        Some(&InventoryAction::Move {
            count: 1,
            from: main_slot(0),
            to: SlotRef::new(InventoryLocation::CurrentPlayer, "craft", 0),
            move_somewhere: true,
        }),
    );
}

#[test]
fn craft_preview_clicks_become_craft_requests() {
    let (mut menu, _) = menu_with(indoc! {"
        size[10,6]
        list[current_player;craftpreview;0,0;1,1]
    "});
    let mut inv = VecInventory::new();
    inv.set_list(
        InventoryLocation::CurrentPlayer,
        "craftpreview",
        vec![ItemStack::new("stick", 4)],
    );
    inv.set_list(
        InventoryLocation::CurrentPlayer,
        "craftresult",
        vec![ItemStack::new("stick", 4)],
    );
    let pos = slot_center(&menu, 0, 0);
    press(&mut menu, &mut inv, pos, PointerButton::Left);
    press(&mut menu, &mut inv, pos, PointerButton::Middle);
    assert_eq!(
        inv.actions,
        vec![
            InventoryAction::Craft {
                count: 1,
                location: InventoryLocation::CurrentPlayer,
            },
            InventoryAction::Craft {
                count: 10,
                location: InventoryLocation::CurrentPlayer,
            },
        ],
    );
    // The craft output is implicitly carried, whole.
    assert_eq!(
        menu.selected(),
        Some((
            SlotRef::new(InventoryLocation::CurrentPlayer, "craftresult", 0),
            4,
        )),
    );
}

#[test]
fn oversized_list_shrinks_to_the_backing_inventory() {
    let (mut menu, _) = menu_with("size[10,6]list[current_player;main;0,0;8,4]");
    let mut inv = VecInventory::new();
    inv.set_list(
        InventoryLocation::CurrentPlayer,
        "main",
        vec![ItemStack::new("dirt", 1); 10],
    );
    // Any event delivery re-fits the lists.
    menu.pointer_event(PointerEvent::Moved { pos: point2(0.0, 0.0) }, &mut inv);

    let list = menu
        .arena()
        .ids()
        .find_map(|id| match &menu.arena().get(id).kind {
            WidgetKind::List(list) => Some(list.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!((list.cols, list.rows), (8, 2));
    // Slots past the real list length are gone for hit-testing too.
    assert_eq!(
        menu.slot_at(slot_center(&menu, 0, 9), &inv),
        Some(main_slot(9)),
    );
    assert_eq!(menu.slot_at(slot_center(&menu, 0, 10), &inv), None);
}

#[test]
fn list_starting_past_the_inventory_trims_to_zero_slots() {
    let (mut menu, _) = menu_with("size[10,6]list[current_player;main;0,0;2,2;8]");
    let mut inv = VecInventory::new();
    inv.set_list(
        InventoryLocation::CurrentPlayer,
        "main",
        vec![ItemStack::new("dirt", 1); 4],
    );
    menu.pointer_event(PointerEvent::Moved { pos: point2(0.0, 0.0) }, &mut inv);

    let list = menu
        .arena()
        .ids()
        .find_map(|id| match &menu.arena().get(id).kind {
            WidgetKind::List(list) => Some(list.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!((list.cols, list.rows), (1, 0));
    assert_eq!(list.slot_count(), 0);
    // Slot geometry stays well-defined for embedders even with no slots.
    assert!(list.slot_rect(0).width() > 0.0);
}

// -------------------------------------------------------------------------------------------------

#[test]
fn sizeless_form_gets_proceed_button_and_field_focus() {
    let (mut menu, recorder) = menu_with("field[name;Name;John]");
    assert_eq!(menu.focused(), Some("name"));
    let proceed = menu.fields().iter().find(|f| f.id == 257).unwrap();
    assert!(proceed.is_exit);
    assert_eq!(proceed.label, "Proceed");

    // Enter accepts and closes.
    assert_eq!(menu.key_event(formspec::Key::Enter), Response::Close);
    let map = recorder.last();
    assert_eq!(map.get("name").map(String::as_str), Some("John"));
    assert_eq!(map.get("key_enter_field").map(String::as_str), Some("name"));
    assert_eq!(map.get("quit").map(String::as_str), Some("true"));
}

#[test]
fn field_close_on_enter_false_keeps_menu_open() {
    let (mut menu, recorder) = menu_with(indoc! {"
        formspec_version[3]size[6,3]
        field[0.5,0.5;5,0.8;q;Question;]
        field_close_on_enter[q;false]
    "});
    assert_eq!(menu.focused(), Some("q"));
    assert_eq!(menu.key_event(formspec::Key::Enter), Response::Consumed);
    assert!(!recorder.last().contains_key("quit"));
}

#[test]
fn unclosed_container_is_not_fatal() {
    let (menu, _) = menu_with("size[4,4]container[1,1]button[0,0;2,1;ok;OK]");
    // The button still exists and is shifted by the container offset.
    let shifted = menu.field("ok").unwrap().rect;
    let (plain_menu, _) = menu_with("size[4,4]button[0,0;2,1;ok;OK]");
    let plain = plain_menu.field("ok").unwrap().rect;
    let offset = shifted.min - plain.min;
    let spacing = plain_menu.scale().spacing;
    assert!(
        (offset.x - spacing.x).abs() < 1e-3 && (offset.y - spacing.y).abs() < 1e-3,
        "offset {offset:?} != spacing {spacing:?}",
    );
}

#[test]
fn regeneration_is_deterministic() {
    let form = indoc! {"
        formspec_version[3]size[12,10]
        style_type[button;textcolor=yellow]
        button[1,1;3,0.8;a;A]
        image[1,2;2,2;foo.png]
        list[current_player;main;1,5;8,4]
    "};
    let (mut menu, _) = menu_with(form);
    let fields_before = menu.fields().to_vec();
    let order_before = menu.draw_order().to_vec();
    menu.regenerate(SCREEN);
    assert_eq!(menu.fields(), fields_before.as_slice());
    assert_eq!(menu.draw_order(), order_before.as_slice());
}

#[test]
fn legacy_forms_sort_draw_order_by_element_class() {
    // Version 1: the label is declared first but must draw after the box.
    let (menu, _) = menu_with("size[4,4]label[0,0;Hi]box[0,1;2,2;#FF0000]");
    let kinds: Vec<bool> = menu
        .draw_order()
        .iter()
        .map(|&id| matches!(menu.arena().get(id).kind, WidgetKind::Label { .. }))
        .collect();
    assert_eq!(kinds, vec![false, true]);
}

#[test]
fn legacy_sort_keeps_declaration_order_within_a_class() {
    let (menu, _) = menu_with(
        "size[6,6]label[0,0;a]box[0,1;1,1;#FF0000]label[0,2;b]box[0,3;1,1;#00FF00]",
    );
    let summary: Vec<String> = menu
        .draw_order()
        .iter()
        .map(|&id| match &menu.arena().get(id).kind {
            WidgetKind::Label { lines, .. } => format!("label {}", lines.join("")),
            WidgetKind::ColorBox { color } => format!("box {color}"),
            _ => "other".to_owned(),
        })
        .collect();
    assert_eq!(
        summary,
        vec!["box #FF0000", "box #00FF00", "label a", "label b"],
    );
}

#[test]
fn version_3_draws_in_declaration_order() {
    let (menu, _) = menu_with(
        "formspec_version[3]size[4,4]label[0,0;Hi]box[0,1;2,2;#FF0000]",
    );
    let kinds: Vec<bool> = menu
        .draw_order()
        .iter()
        .map(|&id| matches!(menu.arena().get(id).kind, WidgetKind::Label { .. }))
        .collect();
    assert_eq!(kinds, vec![true, false]);
}

// -------------------------------------------------------------------------------------------------

const WIDGET_FORM: &str = indoc! {"
    formspec_version[3]size[12,12]
    dropdown[0,0;3,0.8;dd;alpha,beta;1]
    tabheader[0,2;th;One,Two;1;false;true]
    table[0,3;4,3;tbl;r1,r2,r3;2]
    scrollbar[0,7;4,0.5;horizontal;sb;500]
    checkbox[0,8;cb;Check;true]
    field[0,9;3,0.8;fld;Label;hello]
"};

#[test]
fn field_value_formats() {
    let (menu, _) = menu_with(WIDGET_FORM);
    assert_eq!(menu.field_value("dd").as_deref(), Some("alpha"));
    assert_eq!(menu.field_value("th").as_deref(), Some("1"));
    assert_eq!(menu.field_value("tbl").as_deref(), Some("CHG:2"));
    assert_eq!(menu.field_value("sb").as_deref(), Some("VAL:500"));
    assert_eq!(menu.field_value("cb").as_deref(), Some("true"));
    assert_eq!(menu.field_value("fld").as_deref(), Some("hello"));
}

#[test]
fn dropdown_selection_submits_the_item_text() {
    let (mut menu, recorder) = menu_with(WIDGET_FORM);
    assert!(menu.select_dropdown("dd", 2));
    assert_eq!(recorder.last().get("dd").map(String::as_str), Some("beta"));
}

#[test]
fn dropdown_index_event_submits_the_index() {
    let (mut menu, recorder) = menu_with(
        "formspec_version[3]size[6,3]dropdown[0,0;3,0.8;dd;alpha,beta;2;true]",
    );
    assert_eq!(menu.field_value("dd").as_deref(), Some("2"));
    assert!(menu.select_dropdown("dd", 1));
    assert_eq!(recorder.last().get("dd").map(String::as_str), Some("1"));
}

#[test]
fn table_row_selection_submits_change_events() {
    let (mut menu, recorder) = menu_with(WIDGET_FORM);
    assert!(menu.select_table_row("tbl", Some(0)));
    assert_eq!(recorder.last().get("tbl").map(String::as_str), Some("CHG:1"));
    assert!(menu.select_table_row("tbl", None));
    assert_eq!(recorder.last().get("tbl").map(String::as_str), Some("INV"));
}

#[test]
fn scrollbar_moves_submit_chg_then_report_val() {
    let (mut menu, recorder) = menu_with(WIDGET_FORM);
    assert!(menu.set_scrollbar("sb", 700));
    assert_eq!(recorder.last().get("sb").map(String::as_str), Some("CHG:700"));
    // Once the change has been delivered, the value reads back as VAL.
    assert_eq!(menu.field_value("sb").as_deref(), Some("VAL:700"));
    // Out-of-range values clamp.
    menu.set_scrollbar("sb", 5000);
    assert_eq!(menu.field_value("sb").as_deref(), Some("VAL:1000"));
}

#[test]
fn scrollbaroptions_apply_only_to_later_scrollbars() {
    let (mut menu, _) = menu_with(indoc! {"
        formspec_version[3]size[8,6]
        scrollbar[0,0;4,0.5;horizontal;before;0]
        scrollbaroptions[min=0;max=60;smallstep=5]
        scrollbar[0,1;4,0.5;horizontal;after;0]
    "});
    menu.set_scrollbar("before", 5000);
    menu.set_scrollbar("after", 5000);
    assert_eq!(menu.field_value("before").as_deref(), Some("VAL:1000"));
    assert_eq!(menu.field_value("after").as_deref(), Some("VAL:60"));

    let widget = menu.field("after").unwrap().widget.unwrap();
    let WidgetKind::Scrollbar(sb) = &menu.arena().get(widget).kind else {
        panic!("not a scrollbar");
    };
    assert_eq!((sb.max, sb.small_step), (60, 5));
}

#[test]
fn edit_text_survives_regeneration() {
    let (mut menu, _) = menu_with(WIDGET_FORM);
    assert!(menu.set_field_text("fld", "world"));
    menu.select_table_row("tbl", Some(2));
    menu.regenerate(SCREEN);
    assert_eq!(menu.field_value("fld").as_deref(), Some("world"));
    assert_eq!(menu.field_value("tbl").as_deref(), Some("CHG:3"));
}

#[test]
fn scroll_container_contents_follow_the_scrollbar() {
    let (mut menu, _) = menu_with(indoc! {"
        formspec_version[3]size[10,10]
        scrollbar[9,0;0.3,5;vertical;sb;0]
        scroll_container[0,0;8,8;sb;vertical;0.1]
        label[1,1;Hello]
        scroll_container_end[]
    "});
    let label = menu
        .arena()
        .ids()
        .find(|&id| matches!(menu.arena().get(id).kind, WidgetKind::Label { .. }))
        .unwrap();
    let before = menu.arena().absolute_rect(label);
    menu.set_scrollbar("sb", 100);
    let after = menu.arena().absolute_rect(label);
    let shift = 100.0 * 0.1 * menu.scale().imgsize;
    assert_eq!(after, before.translate(vec2(0.0, -shift)));
}

#[test]
fn tooltips_attach_to_fields_and_regions() {
    let (menu, _) = menu_with(indoc! {"
        formspec_version[3]size[8,4]
        button[1,1;2,1;ok;OK]
        tooltip[ok;Press me]
        tooltip[5,1;2,1;Region tip]
    "});
    assert_eq!(menu.tooltip_at(field_center(&menu, "ok")), Some("Press me"));
    let region_center =
        menu.rect().min + vec2(6.0 * menu.scale().imgsize, 1.5 * menu.scale().imgsize);
    assert_eq!(menu.tooltip_at(region_center), Some("Region tip"));
    assert_eq!(menu.tooltip_at(point2(2.0, 2.0)), None);
}

#[test]
fn malformed_elements_are_skipped_not_fatal() {
    let (menu, _) = menu_with(indoc! {"
        size[4,2]
        button[bad;args]
        frobnicate[1,1]
        button[0,0;2,1;ok;OK]
    "});
    assert!(menu.field("ok").is_some());
    assert_eq!(
        menu.fields().iter().filter(|f| !f.name.is_empty()).count(),
        1,
    );
}

#[test]
fn newer_version_does_not_excuse_missing_arguments() {
    // A declared version above ours tolerates extra trailing arguments, but
    // an element still needs its required ones.
    let (menu, _) = menu_with(indoc! {"
        formspec_version[9]size[4,4]
        listcolors[#fff]
        tabheader[0,0;x]
        button[0,0;2,1;ok;OK]
    "});
    assert!(menu.field("ok").is_some());
    assert!(menu.colors().slot_bg_normal.is_none());
    assert!(menu.field("x").is_none());
}

#[test]
fn dynamic_events_do_not_accumulate_stale_keys() {
    let (mut menu, recorder) = menu_with(WIDGET_FORM);
    menu.key_event(formspec::Key::Up);
    assert_eq!(recorder.last().get("key_up").map(String::as_str), Some("true"));
    let n = recorder.count();
    menu.select_dropdown("dd", 2);
    let map = recorder.last();
    assert_eq!(recorder.count(), n + 1);
    assert!(!map.contains_key("key_up"), "pending keys must be cleared");
}

#[test]
fn size_is_fitted_from_screen_height() {
    let (menu, _) = menu_with("formspec_version[3]size[8,6]");
    // 720 px tall screen: one image is 1/15 of the height.
    assert_eq!(menu.scale().imgsize, 48.0);
    // Real-coordinate windows are exactly invsize slots across.
    let size = menu.rect().size();
    assert_eq!(size.width, 8.0 * 48.0);
    assert_eq!(size.height, 6.0 * 48.0);
    // Centered by default.
    assert_eq!(menu.rect().center(), point2(640.0, 360.0));
}

#[test]
fn legacy_size_adds_padding_and_help_text_space() {
    let (menu, _) = menu_with("size[8,6]");
    let size = menu.rect().size();
    // padding*2 + spacing*(n-1) + imgsize, plus 2/3 button height of help
    // text room below.
    assert_eq!(size.width, 2.0 * 18.0 + 60.0 * 7.0 + 48.0);
    let spacing_y = 48.0 * 15.0 / 13.0;
    let expected_h = 2.0 * 18.0 + spacing_y * 5.0 + 48.0 + (spacing_y * 0.35) * 2.0 / 3.0;
    assert!((size.height - expected_h).abs() < 1e-3, "height {}", size.height);
}

#[test]
fn position_and_anchor_move_the_window() {
    let (menu, _) = menu_with(
        "formspec_version[3]size[8,6]position[0,0]anchor[0,0]",
    );
    assert_eq!(menu.rect().min, point2(0.0, 0.0));
}

#[test]
fn out_of_order_window_directives_are_ignored() {
    // `position[]` may not follow `real_coordinates[]`; from there on it is
    // a body element with no effect, so the window stays centered.
    let (menu, _) = menu_with(
        "formspec_version[3]size[8,6]real_coordinates[true]position[0,0]",
    );
    assert_eq!(menu.rect().center(), point2(640.0, 360.0));
}

// -------------------------------------------------------------------------------------------------

struct FixedTextures;

impl TextureSource for FixedTextures {
    fn texture(&mut self, name: &str) -> Option<TextureRef> {
        (name == "foo.png").then_some(TextureRef(7))
    }
}

#[test]
fn texture_source_resolves_image_textures() {
    let mut menu = Menu::new(
        Box::new(StaticFormSource::new(
            "formspec_version[3]size[4,4]image[0,0;2,2;foo.png]",
        )),
        Box::new(Recorder::default()),
        MenuSettings::default(),
    );
    menu.set_texture_source(Box::new(FixedTextures));
    menu.regenerate(SCREEN);
    assert_eq!(menu.texture_for("foo.png"), Some(TextureRef(7)));
    assert_eq!(menu.texture_for("bar.png"), None);
}
