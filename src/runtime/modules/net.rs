//! Minimal HTTP/1.1 server: route registration, one connection at a time.

use super::export;
use crate::runtime::{
    error::{EvalResult, RuntimeError, RuntimeResult, Signal},
    interpreter::Interpreter,
    methods::url_decode,
    types::Type,
    value::{HostObject, MapValue, ModuleValue, NativeFunction, Value},
};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::{
    any::Any,
    cell::RefCell,
    io::{BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    rc::Rc,
};
use tracing::{info, warn};

const SERVER: &str = "server";
const REQUEST: &str = "request";
const RESPONSE: &str = "response";

pub fn module() -> ModuleValue {
    let exports = vec![
        export(NativeFunction::new("create_server", vec![], Type::Host(SERVER), |_, _| {
            Ok(Value::Host(Rc::new(Server::default())))
        })),
        export(NativeFunction::new(
            "serve",
            vec![Type::Host(SERVER), Type::Number],
            Type::Nil,
            |interp, args| {
                let port = args[1].expect_integer("net.serve port")?;
                let port = u16::try_from(port)
                    .map_err(|_| RuntimeError::range(format!("port {port} is out of range")))?;
                match &args[0] {
                    Value::Host(host) => match host.as_any().downcast_ref::<Server>() {
                        Some(server) => serve(interp, server, port),
                        None => Err(RuntimeError::type_mismatch("net.serve expects a server").into()),
                    },
                    _ => Err(RuntimeError::type_mismatch("net.serve expects a server").into()),
                }
            },
        )),
    ];
    ModuleValue::new("net", exports)
}

#[derive(Debug, Clone, PartialEq)]
enum RouteSegment {
    Literal(String),
    Param(String),
}

#[derive(Debug)]
struct Route {
    method: String,
    pattern: Vec<RouteSegment>,
    handler: Value,
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

impl Route {
    fn new(method: &str, path: &str, handler: Value) -> Self {
        let pattern = path_segments(path)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => RouteSegment::Param(name.to_string()),
                None => RouteSegment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            method: method.to_string(),
            pattern,
            handler,
        }
    }

    /// Captured `:params` when `path` matches.
    fn matches(&self, method: &str, path: &str) -> Option<Vec<(String, String)>> {
        if !self.method.eq_ignore_ascii_case(method) {
            return None;
        }
        let segments: Vec<&str> = path_segments(path).collect();
        if segments.len() != self.pattern.len() {
            return None;
        }
        let mut params = Vec::new();
        for (pattern, segment) in self.pattern.iter().zip(segments) {
            match pattern {
                RouteSegment::Literal(literal) if literal == segment => {}
                RouteSegment::Literal(_) => return None,
                RouteSegment::Param(name) => params.push((name.clone(), url_decode(segment))),
            }
        }
        Some(params)
    }
}

#[derive(Debug, Default)]
pub struct Server {
    routes: RefCell<Vec<Route>>,
}

impl Server {
    fn route_method(this: &Rc<dyn HostObject>, method: &'static str) -> Value {
        let this = this.clone();
        NativeFunction::new(
            method,
            vec![Type::String, Type::Any],
            Type::Host(SERVER),
            move |_, mut args| {
                let handler = args.pop().unwrap_or(Value::Nil);
                if !matches!(handler, Value::Function(_) | Value::Native(_)) {
                    return Err(RuntimeError::type_mismatch(format!(
                        "route handler must be a function, got {}",
                        handler.type_of()
                    ))
                    .into());
                }
                let path = args[0].expect_string("route path")?;
                if let Some(server) = this.as_any().downcast_ref::<Server>() {
                    server
                        .routes
                        .borrow_mut()
                        .push(Route::new(&method.to_uppercase(), path, handler));
                }
                Ok(Value::Host(this.clone()))
            },
        )
    }

    fn find(&self, method: &str, path: &str) -> Option<(Value, Vec<(String, String)>)> {
        self.routes.borrow().iter().find_map(|route| {
            route
                .matches(method, path)
                .map(|params| (route.handler.clone(), params))
        })
    }
}

impl HostObject for Server {
    fn type_name(&self) -> &'static str {
        SERVER
    }

    fn describe(&self) -> String {
        format!("<server with {} routes>", self.routes.borrow().len())
    }

    fn member(&self, this: &Rc<dyn HostObject>, name: &str) -> RuntimeResult<Value> {
        match name {
            "get" => Ok(Server::route_method(this, "get")),
            "post" => Ok(Server::route_method(this, "post")),
            _ => Err(RuntimeError::UnknownMember {
                owner: SERVER.into(),
                name: name.into(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A request as read off the wire.
#[derive(Debug, Default, PartialEq)]
pub struct RawRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn parse_request<R: BufRead>(reader: &mut R) -> Result<RawRequest, String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|err| format!("failed to read request line: {err}"))?;
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(format!("malformed request line {:?}", line.trim_end()));
    };
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target, Vec::new()),
    };

    let mut request = RawRequest {
        method: method.to_uppercase(),
        path: url_decode(path),
        query,
        ..RawRequest::default()
    };
    loop {
        let mut header = String::new();
        let read = reader
            .read_line(&mut header)
            .map_err(|err| format!("failed to read header: {err}"))?;
        let header = header.trim_end();
        if read == 0 || header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            request
                .headers
                .push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    let length = request
        .header("content-length")
        .and_then(|len| len.parse::<usize>().ok())
        .unwrap_or(0);
    if length > 0 {
        let mut body = vec![0; length];
        reader
            .read_exact(&mut body)
            .map_err(|err| format!("failed to read body: {err}"))?;
        request.body = String::from_utf8_lossy(&body).into_owned();
    }
    Ok(request)
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (url_decode(key), url_decode(value)),
            None => (url_decode(pair), String::new()),
        })
        .collect()
}

fn string_map(pairs: &[(String, String)]) -> RuntimeResult<MapValue> {
    let map = MapValue::new(Type::String, Type::String);
    for (key, value) in pairs {
        map.set(Value::String(key.clone()), Value::String(value.clone()))?;
    }
    Ok(map)
}

#[derive(Debug)]
struct Request {
    method: String,
    path: String,
    query: MapValue,
    headers: MapValue,
    params: MapValue,
    body: String,
    content_type: String,
}

impl HostObject for Request {
    fn type_name(&self) -> &'static str {
        REQUEST
    }

    fn describe(&self) -> String {
        format!("<request {} {}>", self.method, self.path)
    }

    fn member(&self, _this: &Rc<dyn HostObject>, name: &str) -> RuntimeResult<Value> {
        let value = match name {
            "method" => Value::String(self.method.clone()),
            "path" => Value::String(self.path.clone()),
            "query" => Value::Map(self.query.clone()),
            "headers" => Value::Map(self.headers.clone()),
            "params" => Value::Map(self.params.clone()),
            "body" => Value::String(self.body.clone()),
            "content_type" => Value::String(self.content_type.clone()),
            _ => {
                return Err(RuntimeError::UnknownMember {
                    owner: REQUEST.into(),
                    name: name.into(),
                })
            }
        };
        Ok(value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    fn plain(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: body.to_string(),
        }
    }

    fn set_header(&mut self, name: &str, value: &str) {
        let name = name.to_lowercase();
        match self.headers.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name, value.to_string())),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason(self.status));
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!(
            "content-length: {}\r\nconnection: close\r\n\r\n",
            self.body.len()
        ));
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[derive(Debug)]
struct Response {
    state: RefCell<HttpResponse>,
}

impl Response {
    fn new() -> Self {
        Self {
            state: RefCell::new(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: String::new(),
            }),
        }
    }

    /// A chainable method: applies `update` and hands the response back.
    fn chain(
        this: &Rc<dyn HostObject>,
        name: &'static str,
        params: Vec<Type>,
        update: fn(&mut HttpResponse, &[Value]) -> RuntimeResult<()>,
    ) -> Value {
        let this = this.clone();
        NativeFunction::new(name, params, Type::Host(RESPONSE), move |_, args| {
            if let Some(response) = this.as_any().downcast_ref::<Response>() {
                update(&mut response.state.borrow_mut(), &args)?;
            }
            Ok(Value::Host(this.clone()))
        })
    }
}

impl HostObject for Response {
    fn type_name(&self) -> &'static str {
        RESPONSE
    }

    fn member(&self, this: &Rc<dyn HostObject>, name: &str) -> RuntimeResult<Value> {
        let method = match name {
            "status" => Response::chain(this, "status", vec![Type::Number], |state, args| {
                let code = args[0].expect_integer("status")?;
                state.status = u16::try_from(code)
                    .ok()
                    .filter(|code| (100..600).contains(code))
                    .ok_or_else(|| RuntimeError::range(format!("invalid HTTP status {code}")))?;
                Ok(())
            }),
            "setHeader" => Response::chain(
                this,
                "setHeader",
                vec![Type::String, Type::String],
                |state, args| {
                    let name = args[0].expect_string("setHeader")?;
                    let value = args[1].expect_string("setHeader")?;
                    state.set_header(name, value);
                    Ok(())
                },
            ),
            "write" => Response::chain(this, "write", vec![Type::String], |state, args| {
                state.body.push_str(args[0].expect_string("write")?);
                Ok(())
            }),
            "json" => Response::chain(this, "json", vec![Type::Any], |state, args| {
                state.set_header("content-type", "application/json");
                state.body = to_json(&args[0]);
                Ok(())
            }),
            "html" => Response::chain(this, "html", vec![Type::String], |state, args| {
                state.set_header("content-type", "text/html; charset=utf-8");
                state.body = args[0].expect_string("html")?.to_string();
                Ok(())
            }),
            _ => {
                return Err(RuntimeError::UnknownMember {
                    owner: RESPONSE.into(),
                    name: name.into(),
                })
            }
        };
        Ok(method)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Encodes `value` for `response.json`. Nested values deeper than
/// `MAX_JSON_DEPTH` (pointer cycles) encode as null.
pub fn to_json(value: &Value) -> String {
    serde_json::to_string(&value_to_json(value, 0)).unwrap_or_else(|_| "null".into())
}

const MAX_JSON_DEPTH: usize = 32;

fn value_to_json(value: &Value, depth: usize) -> JsonValue {
    if depth > MAX_JSON_DEPTH {
        return JsonValue::Null;
    }
    match value {
        Value::Nil => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
            JsonValue::Number((*n as i64).into())
        }
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::String(s) | Value::Error(s) => JsonValue::String(s.clone()),
        Value::Array(array) => json_list(&array.items(), depth),
        Value::Slice(slice) => json_list(&slice.items(), depth),
        Value::Map(map) => {
            let mut object = JsonMap::new();
            for (key, val) in map.entries() {
                object.insert(key.display(), value_to_json(&val, depth + 1));
            }
            JsonValue::Object(object)
        }
        Value::Struct(instance) => {
            let mut object = JsonMap::new();
            for field in instance.fields.iter() {
                object.insert(field.name().to_string(), value_to_json(&field.load(), depth + 1));
            }
            JsonValue::Object(object)
        }
        Value::Pointer(pointer) => match pointer.load() {
            Ok(target) => value_to_json(&target, depth + 1),
            Err(_) => JsonValue::Null,
        },
        other => JsonValue::String(other.display()),
    }
}

fn json_list(items: &[Value], depth: usize) -> JsonValue {
    JsonValue::Array(items.iter().map(|item| value_to_json(item, depth + 1)).collect())
}

/// Routes one request. Only `os.exit` inside a handler escapes as an error.
pub fn dispatch(interp: &mut Interpreter, server: &Server, raw: RawRequest) -> EvalResult<HttpResponse> {
    let Some((handler, params)) = server.find(&raw.method, &raw.path) else {
        return Ok(HttpResponse::plain(404, "Not Found"));
    };
    let request = Request {
        content_type: raw.header("content-type").unwrap_or_default().to_string(),
        query: string_map(&raw.query)?,
        headers: string_map(&raw.headers)?,
        params: string_map(&params)?,
        method: raw.method,
        path: raw.path,
        body: raw.body,
    };
    let response: Rc<dyn HostObject> = Rc::new(Response::new());
    let args = vec![Value::Host(Rc::new(request)), Value::Host(response.clone())];
    match interp.call_value(handler, args) {
        Ok(_) => {}
        Err(Signal::Exit(code)) => return Err(Signal::Exit(code)),
        Err(Signal::Throw(value)) => {
            warn!(error = %value.display(), "handler threw");
            return Ok(HttpResponse::plain(500, "Internal Server Error"));
        }
        Err(Signal::Error(err)) => {
            warn!(error = %err, "handler failed");
            return Ok(HttpResponse::plain(500, "Internal Server Error"));
        }
        Err(_) => return Ok(HttpResponse::plain(500, "Internal Server Error")),
    }
    interp.flush();

    let Some(response) = response.as_any().downcast_ref::<Response>() else {
        return Ok(HttpResponse::plain(500, "Internal Server Error"));
    };
    let mut out = response.state.borrow_mut();
    if !out.headers.iter().any(|(key, _)| key == "content-type") {
        out.set_header("content-type", "text/plain; charset=utf-8");
    }
    Ok(HttpResponse {
        status: out.status,
        headers: out.headers.clone(),
        body: out.body.clone(),
    })
}

fn serve(interp: &mut Interpreter, server: &Server, port: u16) -> EvalResult {
    let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|err| RuntimeError::Io {
        message: format!("failed to bind 127.0.0.1:{port}: {err}"),
    })?;
    info!(port, routes = server.routes.borrow().len(), "serving");
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "incoming connection failed");
                continue;
            }
        };
        handle_connection(interp, server, stream)?;
    }
    Ok(Value::Nil)
}

fn handle_connection(interp: &mut Interpreter, server: &Server, mut stream: TcpStream) -> EvalResult<()> {
    let raw = {
        let mut reader = BufReader::new(&mut stream);
        parse_request(&mut reader)
    };
    let response = match raw {
        Ok(raw) => {
            info!(method = %raw.method, path = %raw.path, "request");
            dispatch(interp, server, raw)?
        }
        Err(message) => {
            warn!(%message, "bad request");
            HttpResponse::plain(400, "Bad Request")
        }
    };
    if let Err(err) = stream.write_all(&response.to_bytes()) {
        warn!(error = %err, "failed to write response");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        language::parser::parse_program,
        runtime::value::{ArrayValue, SliceValue},
    };
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn parses_request_line_headers_and_body() {
        let wire = "POST /users/42?verbose=1&q=a%20b HTTP/1.1\r\nHost: x\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello";
        let request = parse_request(&mut Cursor::new(wire)).expect("parse");
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/users/42");
        assert_eq!(
            request.query,
            vec![
                ("verbose".to_string(), "1".to_string()),
                ("q".to_string(), "a b".to_string())
            ]
        );
        assert_eq!(request.header("content-type"), Some("text/plain"));
        assert_eq!(request.body, "hello");
    }

    #[test]
    fn malformed_request_line_is_rejected() {
        assert!(parse_request(&mut Cursor::new("\r\n")).is_err());
    }

    #[test]
    fn routes_capture_params() {
        let route = Route::new("GET", "/users/:id/posts", Value::Nil);
        assert_eq!(
            route.matches("get", "/users/7/posts"),
            Some(vec![("id".to_string(), "7".to_string())])
        );
        assert_eq!(route.matches("GET", "/users/7"), None);
        assert_eq!(route.matches("POST", "/users/7/posts"), None);
    }

    #[test]
    fn json_encoding() {
        let map = MapValue::new(Type::String, Type::Any);
        map.set(Value::String("a".into()), Value::Number(1.0)).expect("set");
        map.set(
            Value::String("b".into()),
            Value::Slice(SliceValue::new(Type::String, vec![Value::String("x\"y".into())])),
        )
        .expect("set");
        map.set(
            Value::String("c".into()),
            Value::Array(ArrayValue::new(Type::Any, vec![Value::Nil, Value::Bool(true)])),
        )
        .expect("set");
        assert_eq!(to_json(&Value::Map(map)), r#"{"a":1,"b":["x\"y"],"c":[null,true]}"#);
    }

    fn server_from(source: &str) -> (Interpreter, Rc<dyn HostObject>) {
        let mut interp = Interpreter::new().with_output(Box::new(std::io::sink()));
        let scope = interp.root_scope();
        let program = parse_program(source).expect("parse");
        interp.evaluate(&program, &scope).expect("evaluate");
        let server = match scope.resolve("server").map(|r| r.load()) {
            Ok(Value::Host(host)) => host,
            other => panic!("expected a server, got {other:?}"),
        };
        (interp, server)
    }

    fn request(method: &str, path: &str) -> RawRequest {
        RawRequest {
            method: method.into(),
            path: path.into(),
            ..RawRequest::default()
        }
    }

    #[test]
    fn dispatches_to_handlers() {
        let (mut interp, host) = server_from(
            r#"
            import net
            let server = net.create_server()
            server.get("/hello/:name", fn(req: any, res: any) {
                res.status(201).setHeader("X-Test", "yes").write("hi " + req.params.get("name"))
            })
            server.post("/boom", fn(req: any, res: any) { throw error("nope") })
            "#,
        );
        let server = host.as_any().downcast_ref::<Server>().expect("server");

        let ok = dispatch(&mut interp, server, request("GET", "/hello/ann")).ok().expect("dispatch");
        assert_eq!(ok.status, 201);
        assert_eq!(ok.body, "hi ann");
        assert!(ok.headers.contains(&("x-test".to_string(), "yes".to_string())));

        let missing = dispatch(&mut interp, server, request("GET", "/nope")).ok().expect("dispatch");
        assert_eq!(missing.status, 404);

        let failed = dispatch(&mut interp, server, request("POST", "/boom")).ok().expect("dispatch");
        assert_eq!(failed.status, 500);
    }

    #[test]
    fn json_keeps_order_and_survives_pointer_cycles() {
        let mut interp = Interpreter::new().with_output(Box::new(std::io::sink()));
        let scope = interp.root_scope();
        let program = parse_program(
            r#"
            import math
            struct Node { label: string, weight: number, next: *Node }
            let head = Node { label: "a\tb", weight: 0.5 }
            head.next = &head
            let payload = map[string->any]{"z": 1, "node": head, "neg": math.log(0)}
            "#,
        )
        .expect("parse");
        interp.evaluate(&program, &scope).expect("evaluate");
        let payload = scope.resolve("payload").map(|r| r.load()).expect("payload");

        let json = to_json(&payload);
        assert!(json.starts_with(r#"{"z":1,"node":{"label":"a\tb","weight":0.5,"next":{"label""#));
        let decoded: JsonValue = serde_json::from_str(&json).expect("valid json");
        assert_eq!(decoded["neg"], JsonValue::Null);
        assert_eq!(decoded["node"]["next"]["weight"], serde_json::json!(0.5));
    }

    #[test]
    fn response_bytes() {
        let response = HttpResponse::plain(404, "Not Found");
        let text = String::from_utf8(response.to_bytes()).expect("utf8");
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("content-length: 9\r\n"));
        assert!(text.ends_with("\r\n\r\nNot Found"));
    }
}
