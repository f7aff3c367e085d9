//! One calculator declaration, bound as a describer, a server, a client and a
//! raising client.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rpcidl::AsyncTransport;
use rpcidl::Arrow;
use rpcidl::Backend;
use rpcidl::Call;
use rpcidl::CallError;
use rpcidl::Client;
use rpcidl::DispatchError;
use rpcidl::ErrorDef;
use rpcidl::Interface;
use rpcidl::InterfaceInfo;
use rpcidl::Interfaces;
use rpcidl::Param;
use rpcidl::RaisingClient;
use rpcidl::Response;
use rpcidl::Returning;
use rpcidl::Server;
use rpcidl::ServerBuilder;
use rpcidl::TransportError;
use rpcidl::signature;
use rpctype::BasicKind;
use rpctype::Rpc;
use rpctype::Type;
use rpctype::UnmarshalError;
use rpctype::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
//  DECLARATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
enum CalcError {
    #[error("division by zero")]
    DivideByZero,
    #[error("overflow in {0}")]
    Overflow(String),
    #[error("negative input {0}")]
    Negative(i64),
}

rpctype::rpc_variant! {
    CalcError as "calc error", "Why a calculation failed" {
        DivideByZero as "DivideByZero", "The divisor was zero";
        Overflow(String) as "Overflow", "An operation overflowed";
        Negative(i64) as "Negative", "Input must not be negative";
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Summary {
    count: i64,
    total: i64,
    mean: Option<f64>,
}

rpctype::rpc_struct! {
    Summary as "summary", "Aggregate of a list of numbers" {
        count: i64 as "count", "Number of inputs";
        total: i64 as "total", "Sum of inputs";
        mean: Option<f64> as "mean", "Average, absent when there are no inputs";
    }
}

type BinOp = Arrow<isize, Arrow<isize, Returning<isize>>>;

struct Calculator<B: Backend> {
    add: B::Method<BinOp>,
    div: B::Method<BinOp>,
    sqrt: B::Method<Arrow<i64, Returning<i64>>>,
    summarize: B::Method<Arrow<Vec<i64>, Returning<Summary>>>,
    greet: B::Method<Arrow<String, Arrow<Option<String>, Returning<String>>>>,
    crash: B::Method<Returning<()>>,
}

fn binop() -> BinOp {
    signature!(
        Param::new("a", "Left operand"),
        Param::new("b", "Right operand")
        => Param::mk(Some("result"), None)
    )
}

impl<B: Backend> Calculator<B> {
    fn declare(backend: &mut B) -> Self {
        Self {
            add: backend.declare("add", "Adds two integers", binop()),
            div: backend.declare("div", "Divides a by b", binop()),
            sqrt: backend.declare("sqrt", "Integer square root", signature!(
                Param::<i64>::new("x", "Radicand") => Param::<i64>::mk(Some("root"), None)
            )),
            summarize: backend.declare("summarize", "Summarizes a list of numbers", signature!(
                Param::<Vec<i64>>::new("values", "Numbers to summarize") => Param::<Summary>::mk(None, None)
            )),
            greet: backend.declare("greet", "Greets someone", signature!(
                Param::<String>::new("name", "Who to greet"),
                Param::<Option<String>>::new("greeting", "How to greet, Hello by default")
                => Param::<String>::mk(Some("message"), None)
            )),
            crash: backend.declare("crash", "Always panics", signature!(
                => Param::<()>::mk(None, None)
            )),
        }
    }
}

// ============================================================================
//  IMPLEMENTATION
// ============================================================================

fn add(a: isize, b: isize) -> Result<isize, CalcError> {
    a.checked_add(b).ok_or_else(|| CalcError::Overflow("add".into()))
}

fn div(a: isize, b: isize) -> Result<isize, CalcError> {
    if b == 0 {
        return Err(CalcError::DivideByZero);
    }
    a.checked_div(b).ok_or_else(|| CalcError::Overflow("div".into()))
}

fn sqrt(x: i64) -> anyhow::Result<i64> {
    if x < 0 {
        return Err(CalcError::Negative(x).into());
    }
    if x > 1 << 52 {
        anyhow::bail!("{} is too large", x);
    }
    Ok((x as f64).sqrt() as i64)
}

fn summarize(values: Vec<i64>) -> Result<Summary, CalcError> {
    let total = values
        .iter()
        .try_fold(0i64, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| CalcError::Overflow("summarize".into()))?;
    let count = values.len() as i64;
    let mean = (count > 0).then(|| total as f64 / count as f64);
    Ok(Summary { count, total, mean })
}

fn greet(name: String, greeting: Option<String>) -> Result<String, CalcError> {
    Ok(format!("{}, {}!", greeting.as_deref().unwrap_or("Hello"), name))
}

fn crash() -> Result<(), CalcError> {
    panic!("kaboom")
}

fn calculator(info: InterfaceInfo) -> Server {
    let mut builder = ServerBuilder::<CalcError>::new(info);
    let calc = Calculator::declare(&mut builder);
    calc.add.implement(add).unwrap();
    calc.div.implement(div).unwrap();
    calc.sqrt.implement_raising(sqrt).unwrap();
    calc.summarize.implement(summarize).unwrap();
    calc.greet.implement(greet).unwrap();
    calc.crash.implement(crash).unwrap();
    builder.build()
}

fn info() -> InterfaceInfo {
    InterfaceInfo::new("calculator").description("Integer arithmetic")
}

fn args(entries: &[(&str, Value)]) -> Vec<(String, Value)> {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

/// Answers every call with `5`, after checking it was `add(2, 3)`.
fn echo_five(call: Call) -> Result<Response, TransportError> {
    assert_eq!(call.name, "add");
    assert_eq!(call.params, vec![Value::Dict(args(&[("a", Value::Int(2)), ("b", Value::Int(3))]))]);
    assert!(!call.is_notification);
    Ok(Response::success(Value::Int(5)))
}

fn disconnected(_call: Call) -> Result<Response, TransportError> {
    Err(TransportError::ConnectionLost("peer gone".into()))
}

fn garbled(_call: Call) -> Result<Response, TransportError> {
    Ok(Response::success(Value::String("five".into())))
}

// ============================================================================
//  SERVER DISPATCH
// ============================================================================

#[test]
fn test_dispatch_add() {
    init_tracing();
    let server = calculator(info());
    let call = Call::named("add", args(&[("a", Value::Int(2)), ("b", Value::Int(3))]));
    assert_eq!(server.dispatch(&call), Response { success: true, contents: Value::Int(5) });
}

#[test]
fn test_dispatch_missing_argument() {
    let server = calculator(info());
    let call = Call::named("add", args(&[("a", Value::Int(2))]));
    assert_eq!(server.try_dispatch(&call), Err(DispatchError::MissingArgument("b".into())));
    assert_eq!(
        server.dispatch(&call),
        Response::failure(Value::String("missing argument 'b'".into()))
    );
}

#[test]
fn test_dispatch_unknown_method() {
    let server = calculator(info());
    let call = Call::named("subtract", args(&[("a", Value::Int(2)), ("b", Value::Int(3))]));
    assert_eq!(server.try_dispatch(&call), Err(DispatchError::UnknownMethod("subtract".into())));
    assert!(!server.dispatch(&call).success);
}

#[test]
fn test_dispatch_handler_error_is_marshalled() {
    let server = calculator(info());
    let call = Call::named("div", args(&[("a", Value::Int(1)), ("b", Value::Int(0))]));
    assert_eq!(server.dispatch(&call), Response::failure(Value::String("DivideByZero".into())));

    let call = Call::named("add", args(&[("a", Value::Int(isize::MAX as i64)), ("b", Value::Int(1))]));
    assert_eq!(
        server.dispatch(&call),
        Response::failure(Value::Enum(vec![Value::String("Overflow".into()), Value::String("add".into())]))
    );
}

#[test]
fn test_dispatch_int_arguments_are_strict() {
    let server = calculator(info());
    let call = Call::named("add", args(&[("a", Value::Int32(2)), ("b", Value::Int(3))]));
    assert!(matches!(
        server.try_dispatch(&call),
        Err(DispatchError::InvalidArgument { ref name, .. }) if name == "a"
    ));
    assert!(!server.dispatch(&call).success);

    let call = Call::named("div", args(&[("b", Value::Int(-2)), ("a", Value::Int(7))]));
    assert_eq!(server.dispatch(&call), Response::success(Value::Int(-3)));
}

#[test]
fn test_dispatch_optional_argument() {
    let server = calculator(info());
    let call = Call::named("greet", args(&[("name", Value::String("Ada".into()))]));
    assert_eq!(server.dispatch(&call), Response::success(Value::String("Hello, Ada!".into())));
}

#[test]
fn test_server_methods_sorted() {
    let server = calculator(info());
    assert_eq!(server.methods(), vec!["add", "crash", "div", "greet", "sqrt", "summarize"]);
    assert_eq!(server.info().name, "calculator");
}

// ============================================================================
//  CLIENTS
// ============================================================================

#[test]
fn test_client_over_echo_transport() {
    let mut client = Client::<_, CalcError>::new(info(), echo_five);
    let calc = Calculator::declare(&mut client);
    assert_eq!(calc.add.call((2, 3)), Ok(5));
    assert_eq!(calc.add.name(), "add");
}

#[test]
fn test_raising_client_over_echo_transport() -> anyhow::Result<()> {
    let mut client = RaisingClient::<_, CalcError>::new(info(), echo_five);
    let calc = Calculator::declare(&mut client);
    assert_eq!(calc.add.call((2, 3))?, 5);
    Ok(())
}

#[test]
fn test_loopback_round_trips() {
    init_tracing();
    let mut client = Client::<_, CalcError>::new(info(), calculator(info()));
    let calc = Calculator::declare(&mut client);

    assert_eq!(calc.add.call((40, 2)), Ok(42));
    assert_eq!(calc.div.call((9, 2)), Ok(4));
    assert_eq!(
        calc.summarize.call((vec![1, 2, 3],)),
        Ok(Summary { count: 3, total: 6, mean: Some(2.0) })
    );
    assert_eq!(
        calc.summarize.call((vec![],)),
        Ok(Summary { count: 0, total: 0, mean: None })
    );
    assert_eq!(calc.greet.call(("Ada".to_string(), None)), Ok("Hello, Ada!".to_string()));
    assert_eq!(
        calc.greet.call(("Ada".to_string(), Some("Howdy".to_string()))),
        Ok("Howdy, Ada!".to_string())
    );
}

#[test]
fn test_loopback_interface_errors() {
    let mut client = Client::<_, CalcError>::new(info(), calculator(info()));
    let calc = Calculator::declare(&mut client);

    assert_eq!(calc.div.call((1, 0)), Err(CallError::Remote(CalcError::DivideByZero)));
    assert_eq!(
        calc.add.call((isize::MAX, 1)),
        Err(CallError::Remote(CalcError::Overflow("add".into())))
    );
}

#[test]
fn test_raising_handlers() {
    let mut client = Client::<_, CalcError>::new(info(), calculator(info()));
    let calc = Calculator::declare(&mut client);

    assert_eq!(calc.sqrt.call((16,)), Ok(4));
    assert_eq!(calc.sqrt.call((-4,)), Err(CallError::Remote(CalcError::Negative(-4))));
    match calc.sqrt.call((1 << 53,)) {
        Err(CallError::Failed(reason)) => assert!(reason.contains("too large"), "{}", reason),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_panics_are_contained() {
    let mut client = Client::<_, CalcError>::new(info(), calculator(info()));
    let calc = Calculator::declare(&mut client);

    match calc.crash.call(()) {
        Err(CallError::Failed(reason)) => assert!(reason.contains("kaboom"), "{}", reason),
        other => panic!("unexpected {:?}", other),
    }
    // the server keeps serving
    assert_eq!(calc.add.call((1, 1)), Ok(2));
}

#[test]
fn test_raising_client_raises_interface_errors() {
    let mut client = RaisingClient::<_, CalcError>::new(info(), calculator(info()));
    let calc = Calculator::declare(&mut client);

    let err = calc.div.call((1, 0)).unwrap_err();
    assert_eq!(err.downcast_ref::<CalcError>(), Some(&CalcError::DivideByZero));

    let err = calc.crash.call(()).unwrap_err();
    assert!(matches!(err.downcast_ref::<CallError<CalcError>>(), Some(CallError::Failed(_))));
}

#[test]
fn test_raising_client_custom_raiser() {
    let errors = ErrorDef::<CalcError>::with_handlers(
        |err| anyhow::anyhow!("calculator refused: {}", err),
        |_| None,
    );
    let mut client = RaisingClient::new(info(), calculator(info())).with_errors(errors);
    let calc = Calculator::declare(&mut client);

    let err = calc.div.call((1, 0)).unwrap_err();
    assert_eq!(err.to_string(), "calculator refused: division by zero");
}

#[test]
fn test_transport_failures() {
    let mut client = Client::<_, CalcError>::new(info(), disconnected);
    let calc = Calculator::declare(&mut client);
    assert_eq!(
        calc.add.call((1, 2)),
        Err(CallError::Transport(TransportError::ConnectionLost("peer gone".into())))
    );

    let mut client = RaisingClient::<_, CalcError>::new(info(), disconnected);
    let calc = Calculator::declare(&mut client);
    let err = calc.add.call((1, 2)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CallError<CalcError>>(),
        Some(CallError::Transport(TransportError::ConnectionLost(_)))
    ));
}

#[test]
fn test_malformed_result() {
    let mut client = Client::<_, CalcError>::new(info(), garbled);
    let calc = Calculator::declare(&mut client);
    assert!(matches!(
        calc.add.call((1, 2)),
        Err(CallError::Unmarshal(UnmarshalError::ShapeMismatch { .. }))
    ));
}

#[test]
fn test_namespaced_wire_names() {
    let namespaced = info().namespace("calc");
    let server = calculator(namespaced.clone());
    assert!(server.methods().contains(&"calc.add"));

    let bare = Call::named("add", args(&[("a", Value::Int(2)), ("b", Value::Int(3))]));
    assert_eq!(server.try_dispatch(&bare), Err(DispatchError::UnknownMethod("add".into())));

    let mut client = Client::<_, CalcError>::new(namespaced, server);
    let calc = Calculator::declare(&mut client);
    assert_eq!(calc.add.name(), "calc.add");
    assert_eq!(calc.add.call((2, 3)), Ok(5));
}

#[test]
fn test_methods_as_plain_functions() {
    let mut client = Client::<_, CalcError>::new(info(), calculator(info()));
    let calc = Calculator::declare(&mut client);

    let add = calc.add.clone().into_fn();
    assert_eq!(add(2, 3), Ok(5));
    let greet = calc.greet.into_fn();
    assert_eq!(greet("Bob".into(), None), Ok("Hello, Bob!".to_string()));
    let crash = calc.crash.into_fn();
    assert!(matches!(crash(), Err(CallError::Failed(_))));
}

#[test]
fn test_concurrent_dispatch() {
    let server = calculator(info());
    std::thread::scope(|scope| {
        for seed in 0..4u64 {
            let server = server.clone();
            scope.spawn(move || {
                let mut client = Client::<_, CalcError>::new(info(), server);
                let calc = Calculator::declare(&mut client);
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..250 {
                    let a = rng.gen_range(-1_000_000..1_000_000isize);
                    let b = rng.gen_range(-1_000_000..1_000_000isize);
                    assert_eq!(calc.add.call((a, b)), Ok(a + b));
                    if b != 0 {
                        assert_eq!(calc.div.call((a, b)), Ok(a / b));
                    }
                }
            });
        }
    });
}

// ============================================================================
//  DESCRIBER
// ============================================================================

#[test]
fn test_describer_matches_declaration() {
    let mut iface = Interface::new(info()).with_errors::<CalcError>();
    let calc = Calculator::declare(&mut iface);

    let names: Vec<&str> = iface.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["add", "div", "sqrt", "summarize", "greet", "crash"]);

    let params: Vec<&str> = calc.add.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["a", "b"]);
    assert_eq!(calc.add.result.name, "result");
    assert_eq!(calc.add.params[0].def.ty, Type::Basic(BasicKind::Int));
    assert_eq!(calc.add.result.description, "native-width signed integer");
    assert_eq!(calc.div.description, "Divides a by b");
    assert_eq!(calc.summarize.result.def, Summary::typedef());
    assert!(matches!(calc.greet.params[1].def.ty, Type::Option(_)));
    assert!(calc.crash.params.is_empty());
    assert_eq!(calc.crash.result.def.ty, Type::Unit);
    assert_eq!(calc.div.errors.name, "calc error");
}

#[test]
fn test_type_declarations_for_generators() {
    let mut iface = Interface::new(info()).with_errors::<CalcError>();
    Calculator::declare(&mut iface);

    let decls: Vec<&str> = iface.type_decls().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(decls, vec!["summary", "calc error"]);

    let mut other = Interface::new(InterfaceInfo::new("stats")).with_errors::<CalcError>();
    Calculator::declare(&mut other);
    let all = Interfaces::new("math", "Math services", "Arithmetic over rpc")
        .add(iface)
        .add(other);
    let decls: Vec<&str> = all.type_decls().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(decls, vec!["summary", "calc error"]);
}

#[test]
fn test_results_validate_against_descriptors() {
    let server = calculator(info());
    let call = Call::named("summarize", args(&[("values", Value::Enum(vec![Value::Int(4), Value::Int(6)]))]));
    let response = server.dispatch(&call);
    assert!(response.success);
    assert_eq!(rpctype::check(&Summary::typedef(), &response.contents), Ok(()));
}

// ============================================================================
//  ASYNC
// ============================================================================

/// Yields to the runtime before answering.
struct Deferred {
    server: Server,
}

#[async_trait::async_trait]
impl AsyncTransport for Deferred {
    async fn call(&self, call: Call) -> Result<Response, TransportError> {
        tokio::task::yield_now().await;
        Ok(self.server.dispatch(&call))
    }
}

#[tokio::test]
async fn test_async_loopback() {
    let mut client = Client::<_, CalcError>::new(info(), calculator(info()));
    let calc = Calculator::declare(&mut client);
    assert_eq!(calc.add.call_async((2, 3)).await, Ok(5));
    assert_eq!(calc.div.call_async((1, 0)).await, Err(CallError::Remote(CalcError::DivideByZero)));

    let mut client = RaisingClient::<_, CalcError>::new(info(), calculator(info()));
    let calc = Calculator::declare(&mut client);
    let err = calc.div.call_async((1, 0)).await.unwrap_err();
    assert_eq!(err.downcast_ref::<CalcError>(), Some(&CalcError::DivideByZero));
}

#[tokio::test]
async fn test_async_transport_concurrent_calls() {
    let transport = Deferred { server: calculator(info()) };
    let mut client = Client::<_, CalcError>::new(info(), transport);
    let calc = Calculator::declare(&mut client);

    let mut handles = Vec::new();
    for i in 0..16isize {
        let add = calc.add.clone();
        handles.push(tokio::spawn(async move { (i, add.call_async((i, i)).await) }));
    }
    for handle in handles {
        let (i, result) = handle.await.unwrap();
        assert_eq!(result, Ok(2 * i));
    }
}
