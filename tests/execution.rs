//! End-to-end scenarios driving `Driver` directly over hand-built ASTs.

mod support;

use arduino_interpreter_core::ast::TypeTag;
use arduino_interpreter_core::commands::{CommandKind, CommandValue};
use arduino_interpreter_core::config::Config;
use arduino_interpreter_core::operators::{AssignmentOperator, BinaryOperator, ComparisonOperator, UnaryOperator};
use arduino_interpreter_core::{Driver, ExecutionState, Value};
use pretty_assertions::assert_eq;
use support::{AstBuilder, SwitchArm};

fn kinds(driver: &mut Driver) -> Vec<CommandKind> {
    driver.take_commands().into_iter().map(|r| r.kind).collect()
}

#[test]
fn blink_produces_the_expected_stream_and_stops_at_the_loop_cap() {
    let mut b = AstBuilder::new();

    let pin = b.int_lit(13);
    let output = b.identifier("OUTPUT");
    let pin_mode_call = b.call("pinMode", &[pin, output]);
    let pin_mode_stmt = b.expr_stmt(pin_mode_call);
    let setup_body = b.block(&[pin_mode_stmt]);
    let setup_fn = b.function_def("setup", &[], TypeTag::Void, setup_body);

    let p1 = b.int_lit(13);
    let high = b.identifier("HIGH");
    let write_high_call = b.call("digitalWrite", &[p1, high]);
    let write_high = b.expr_stmt(write_high_call);
    let d1 = b.int_lit(1000);
    let delay1_call = b.call("delay", &[d1]);
    let delay1 = b.expr_stmt(delay1_call);
    let p2 = b.int_lit(13);
    let low = b.identifier("LOW");
    let write_low_call = b.call("digitalWrite", &[p2, low]);
    let write_low = b.expr_stmt(write_low_call);
    let d2 = b.int_lit(1000);
    let delay2_call = b.call("delay", &[d2]);
    let delay2 = b.expr_stmt(delay2_call);
    let loop_body = b.block(&[write_high, delay1, write_low, delay2]);
    let loop_fn = b.function_def("loop", &[], TypeTag::Void, loop_body);

    let bytes = b.finish(&[setup_fn, loop_fn]);

    let config = Config { max_loop_iterations: 2, sync_mode: true, ..Config::default() };
    let mut driver = Driver::new(&bytes, config, None).unwrap();

    driver.start().unwrap();
    driver.tick().unwrap();
    driver.tick().unwrap();
    driver.tick().unwrap();

    assert_eq!(driver.get_state(), ExecutionState::Complete);

    let one_iteration = vec![
        CommandKind::DIGITAL_WRITE { pin: 13, value: 1 },
        CommandKind::DELAY { duration: 1000 },
        CommandKind::DIGITAL_WRITE { pin: 13, value: 0 },
        CommandKind::DELAY { duration: 1000 },
    ];

    let mut expected = vec![
        CommandKind::VERSION_INFO {
            component: "interpreter".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "ready".to_string(),
        },
        CommandKind::PROGRAM_START,
        CommandKind::SETUP_START,
        CommandKind::PIN_MODE { pin: 13, mode: 1 },
        CommandKind::SETUP_END,
    ];
    for _ in 0..2 {
        expected.push(CommandKind::LOOP_START);
        expected.extend(one_iteration.clone());
        expected.push(CommandKind::LOOP_END);
    }
    expected.push(CommandKind::LOOP_LIMIT_REACHED {
        phase: "loop".to_string(),
        iterations: 2,
        message: "top-level loop iteration cap reached".to_string(),
    });
    expected.push(CommandKind::PROGRAM_END);

    assert_eq!(kinds(&mut driver), expected);
}

#[test]
fn no_command_is_emitted_after_program_end() {
    let mut b = AstBuilder::new();
    let setup_body = b.block(&[]);
    let setup_fn = b.function_def("setup", &[], TypeTag::Void, setup_body);
    let loop_body = b.block(&[]);
    let loop_fn = b.function_def("loop", &[], TypeTag::Void, loop_body);
    let bytes = b.finish(&[setup_fn, loop_fn]);

    let config = Config { max_loop_iterations: 1, sync_mode: true, ..Config::default() };
    let mut driver = Driver::new(&bytes, config, None).unwrap();
    driver.start().unwrap();
    driver.tick().unwrap();
    driver.tick().unwrap();
    assert_eq!(driver.get_state(), ExecutionState::Complete);
    let _ = driver.take_commands();

    driver.tick().unwrap();
    driver.tick().unwrap();
    assert!(driver.take_commands().is_empty());
}

#[test]
fn analog_read_suspends_and_resumes_exactly_once() {
    let mut b = AstBuilder::new();
    let setup_empty = b.block(&[]);
    let setup_fn = b.function_def("setup", &[], TypeTag::Void, setup_empty);

    let a0 = b.identifier("A0");
    let read_call = b.call("analogRead", &[a0]);
    let vdecl = b.var_decl("v", TypeTag::Int, Some(read_call));
    let vident = b.identifier("v");
    let println_call = b.call("Serial.println", &[vident]);
    let println_stmt = b.expr_stmt(println_call);
    let loop_body = b.block(&[vdecl, println_stmt]);
    let loop_fn = b.function_def("loop", &[], TypeTag::Void, loop_body);

    let bytes = b.finish(&[setup_fn, loop_fn]);

    let config = Config { max_loop_iterations: 1, sync_mode: false, ..Config::default() };
    let mut driver = Driver::new(&bytes, config, None).unwrap();

    driver.start().unwrap();
    driver.tick().unwrap();

    assert!(driver.is_waiting_for_response());
    let request_id = driver.get_waiting_request_id().unwrap();

    let before_resume = kinds(&mut driver);
    assert!(matches!(before_resume.last().unwrap(), CommandKind::ANALOG_READ_REQUEST { pin: 14, .. }));

    driver.resume(request_id, Value::Int(975)).unwrap();

    let after_resume = kinds(&mut driver);
    // Exactly one request for this call — resuming it must not issue a second one.
    assert!(!after_resume.iter().any(|k| matches!(k, CommandKind::ANALOG_READ_REQUEST { .. })));
    assert_eq!(
        after_resume,
        vec![
            CommandKind::VAR_SET { variable: "v".to_string(), value: CommandValue::Int(975) },
            CommandKind::SERIAL_PRINTLN { data: "975".to_string() },
            CommandKind::LOOP_END,
        ]
    );
}

#[test]
fn nested_arithmetic_with_user_function_calls() {
    let mut b = AstBuilder::new();

    let a_ident = b.identifier("a");
    let b_ident = b.identifier("b");
    let sum = b.binary(BinaryOperator::Add, a_ident, b_ident);
    let add_ret = b.return_stmt(Some(sum));
    let add_body = b.block(&[add_ret]);
    let add_fn = b.function_def("add", &[("a", TypeTag::Int, false), ("b", TypeTag::Int, false)], TypeTag::Int, add_body);

    let a_ident2 = b.identifier("a");
    let b_ident2 = b.identifier("b");
    let product = b.binary(BinaryOperator::Mul, a_ident2, b_ident2);
    let mul_ret = b.return_stmt(Some(product));
    let mul_body = b.block(&[mul_ret]);
    let mul_fn = b.function_def("mul", &[("a", TypeTag::Int, false), ("b", TypeTag::Int, false)], TypeTag::Int, mul_body);

    let setup_empty = b.block(&[]);
    let setup_fn = b.function_def("setup", &[], TypeTag::Void, setup_empty);

    let five = b.int_lit(5);
    let ten = b.int_lit(10);
    let add_call = b.call("add", &[five, ten]);
    let two = b.int_lit(2);
    let mul_call = b.call("mul", &[add_call, two]);
    let rdecl = b.var_decl("r", TypeTag::Int, Some(mul_call));
    let rident = b.identifier("r");
    let println_call = b.call("Serial.println", &[rident]);
    let println_stmt = b.expr_stmt(println_call);
    let loop_body = b.block(&[rdecl, println_stmt]);
    let loop_fn = b.function_def("loop", &[], TypeTag::Void, loop_body);

    let bytes = b.finish(&[add_fn, mul_fn, setup_fn, loop_fn]);

    let config = Config { max_loop_iterations: 1, sync_mode: true, ..Config::default() };
    let mut driver = Driver::new(&bytes, config, None).unwrap();
    driver.start().unwrap();
    driver.tick().unwrap();

    let produced = kinds(&mut driver);
    assert!(produced
        .iter()
        .any(|k| matches!(k, CommandKind::VAR_SET { variable, value } if variable == "r" && *value == CommandValue::Int(30))));
    assert!(produced.contains(&CommandKind::SERIAL_PRINTLN { data: "30".to_string() }));
}

#[test]
fn reference_parameter_mutation_is_visible_to_the_caller() {
    let mut b = AstBuilder::new();

    let n_ident = b.identifier("n");
    let one = b.int_lit(1);
    let new_n = b.binary(BinaryOperator::Add, n_ident, one);
    let n_target = b.identifier("n");
    let assign_expr = b.assign(AssignmentOperator::Set, n_target, new_n);
    let assign_stmt = b.expr_stmt(assign_expr);
    let inc_body = b.block(&[assign_stmt]);
    let inc_fn = b.function_def("increment", &[("n", TypeTag::Int, true)], TypeTag::Void, inc_body);

    let zero = b.int_lit(0);
    let counter_decl = b.var_decl("counter", TypeTag::Int, Some(zero));
    let counter_arg = b.identifier("counter");
    let call_inc = b.call("increment", &[counter_arg]);
    let call_stmt = b.expr_stmt(call_inc);
    let counter_ident = b.identifier("counter");
    let println_call = b.call("Serial.println", &[counter_ident]);
    let println_stmt = b.expr_stmt(println_call);
    let setup_body = b.block(&[counter_decl, call_stmt, println_stmt]);
    let setup_fn = b.function_def("setup", &[], TypeTag::Void, setup_body);

    let loop_empty = b.block(&[]);
    let loop_fn = b.function_def("loop", &[], TypeTag::Void, loop_empty);

    let bytes = b.finish(&[inc_fn, setup_fn, loop_fn]);

    let config = Config::default();
    let mut driver = Driver::new(&bytes, config, None).unwrap();
    driver.start().unwrap();

    let prints: Vec<String> = kinds(&mut driver)
        .into_iter()
        .filter_map(|k| match k {
            CommandKind::SERIAL_PRINTLN { data } => Some(data),
            _ => None,
        })
        .collect();

    assert_eq!(prints, vec!["1".to_string()]);
}

#[test]
fn two_dimensional_array_element_round_trips() {
    let mut b = AstBuilder::new();

    let pixels_decl = b.var_decl_array("pixels", TypeTag::Int, &[2, 2]);

    let pixels_ident = b.identifier("pixels");
    let zero_a = b.int_lit(0);
    let zero_b = b.int_lit(0);
    let target = b.index_expr(pixels_ident, &[zero_a, zero_b]);
    let one = b.int_lit(1);
    let assign_expr = b.assign(AssignmentOperator::Set, target, one);
    let assign_stmt = b.expr_stmt(assign_expr);

    let pixels_ident2 = b.identifier("pixels");
    let zero_c = b.int_lit(0);
    let zero_d = b.int_lit(0);
    let read_index = b.index_expr(pixels_ident2, &[zero_c, zero_d]);
    let this_pixel = b.var_decl("thisPixel", TypeTag::Int, Some(read_index));

    let setup_body = b.block(&[pixels_decl, assign_stmt, this_pixel]);
    let setup_fn = b.function_def("setup", &[], TypeTag::Void, setup_body);

    let loop_empty = b.block(&[]);
    let loop_fn = b.function_def("loop", &[], TypeTag::Void, loop_empty);

    let bytes = b.finish(&[setup_fn, loop_fn]);

    let config = Config::default();
    let mut driver = Driver::new(&bytes, config, None).unwrap();
    driver.start().unwrap();

    let produced = kinds(&mut driver);
    assert!(produced.contains(&CommandKind::VAR_SET {
        variable: "thisPixel".to_string(),
        value: CommandValue::Int(1),
    }));
}

#[test]
fn switch_falls_through_from_the_matching_case() {
    let mut b = AstBuilder::new();

    let discriminant = b.int_lit(2);

    let one = b.int_lit(1);
    let one_str = b.string_lit("one");
    let print_one_call = b.call("Serial.println", &[one_str]);
    let print_one = b.expr_stmt(print_one_call);

    let two = b.int_lit(2);
    let two_str = b.string_lit("two");
    let print_two_call = b.call("Serial.println", &[two_str]);
    let print_two = b.expr_stmt(print_two_call);

    let three = b.int_lit(3);
    let three_str = b.string_lit("three");
    let print_three_call = b.call("Serial.println", &[three_str]);
    let print_three = b.expr_stmt(print_three_call);
    let break_stmt = b.break_stmt();

    let default_str = b.string_lit("d");
    let print_default_call = b.call("Serial.println", &[default_str]);
    let print_default = b.expr_stmt(print_default_call);

    let switch_node = b.switch_stmt(
        discriminant,
        vec![
            SwitchArm { value: Some(one), statements: vec![print_one] },
            SwitchArm { value: Some(two), statements: vec![print_two] },
            SwitchArm { value: Some(three), statements: vec![print_three, break_stmt] },
            SwitchArm { value: None, statements: vec![print_default] },
        ],
    );
    let loop_body = b.block(&[switch_node]);
    let loop_fn = b.function_def("loop", &[], TypeTag::Void, loop_body);
    let setup_empty = b.block(&[]);
    let setup_fn = b.function_def("setup", &[], TypeTag::Void, setup_empty);

    let bytes = b.finish(&[setup_fn, loop_fn]);

    let config = Config { max_loop_iterations: 1, sync_mode: true, ..Config::default() };
    let mut driver = Driver::new(&bytes, config, None).unwrap();
    driver.start().unwrap();
    driver.tick().unwrap();

    let prints: Vec<String> = kinds(&mut driver)
        .into_iter()
        .filter_map(|k| match k {
            CommandKind::SERIAL_PRINTLN { data } => Some(data),
            _ => None,
        })
        .collect();

    assert_eq!(prints, vec!["two".to_string(), "three".to_string()]);
}

#[test]
fn for_loop_continue_still_runs_the_update() {
    let mut b = AstBuilder::new();

    let zero = b.int_lit(0);
    let init = b.var_decl("i", TypeTag::Int, Some(zero));

    let cond_i = b.identifier("i");
    let five = b.int_lit(5);
    let condition = b.comparison(ComparisonOperator::Lt, cond_i, five);

    let update_i = b.identifier("i");
    let update = b.unary(UnaryOperator::Increment, update_i, true);

    let skip_i = b.identifier("i");
    let two = b.int_lit(2);
    let skip_cond = b.comparison(ComparisonOperator::Eq, skip_i, two);
    let continue_stmt = b.continue_stmt();
    let skip_if = b.if_stmt(skip_cond, continue_stmt, None);

    let print_i_ident = b.identifier("i");
    let print_call = b.call("Serial.println", &[print_i_ident]);
    let print_i = b.expr_stmt(print_call);

    let body = b.block(&[skip_if, print_i]);
    let for_node = b.for_stmt(Some(init), Some(condition), Some(update), body);
    let loop_body = b.block(&[for_node]);
    let loop_fn = b.function_def("loop", &[], TypeTag::Void, loop_body);
    let setup_empty = b.block(&[]);
    let setup_fn = b.function_def("setup", &[], TypeTag::Void, setup_empty);

    let bytes = b.finish(&[setup_fn, loop_fn]);

    let config = Config { max_loop_iterations: 1, sync_mode: true, ..Config::default() };
    let mut driver = Driver::new(&bytes, config, None).unwrap();
    driver.start().unwrap();
    driver.tick().unwrap();

    let prints: Vec<String> = kinds(&mut driver)
        .into_iter()
        .filter_map(|k| match k {
            CommandKind::SERIAL_PRINTLN { data } => Some(data),
            _ => None,
        })
        .collect();

    assert_eq!(prints, vec!["0".to_string(), "1".to_string(), "3".to_string(), "4".to_string()]);
}
