//! Runtime support emitted into every module.
//!
//! These functions implement the bump allocator, string and list helpers and
//! the printing routines behind `write`. They only depend on the host
//! imports declared in [`IMPORTS`].
//!
//! Memory layout:
//! - address 0 is the null address and static strings start at
//!   [`DATA_START`];
//! - a list is a 12 byte header `[len: i32][elem_size: i32][capacity: i32]`
//!   followed by `capacity` 8 byte slots;
//! - strings are null terminated.

pub const DATA_START: u32 = 8;
pub const LIST_HEADER_SIZE: u32 = 12;
pub const LIST_ELEMENT_SIZE: u32 = 8;
pub const LIST_MIN_CAPACITY: u32 = 4;
pub const PAGE_SIZE: u32 = 65536;

pub const IMPORTS: &str = r#"  (import "env" "write_num" (func $env.write_num (param f64)))
  (import "env" "write_char" (func $env.write_char (param i32)))
  (import "env" "read_num" (func $env.read_num (result f64)))
  (import "env" "f64_to_string" (func $env.f64_to_string (param f64) (result i32)))"#;

/// Returns the cursor and advances it by `size`, growing memory as needed.
const ALLOC: &str = r#"  (func $rt.alloc (param $size i32) (result i32)
    (local $ptr i32)
    global.get $rt.heap_ptr
    local.set $ptr
    global.get $rt.heap_ptr
    local.get $size
    i32.add
    global.set $rt.heap_ptr
    block $fits
      loop $grow
        global.get $rt.heap_ptr
        memory.size
        i32.const 16
        i32.shl
        i32.le_u
        br_if $fits
        i32.const 1
        memory.grow
        i32.const -1
        i32.eq
        if
          unreachable
        end
        br $grow
      end
    end
    local.get $ptr
  )"#;

const STRING_LEN: &str = r#"  (func $rt.string_len (param $ptr i32) (result i32)
    (local $len i32)
    block $done
      loop $scan
        local.get $ptr
        local.get $len
        i32.add
        i32.load8_u
        i32.eqz
        br_if $done
        local.get $len
        i32.const 1
        i32.add
        local.set $len
        br $scan
      end
    end
    local.get $len
  )"#;

const STRING_EQ: &str = r#"  (func $rt.string_eq (param $a i32) (param $b i32) (result i32)
    (local $i i32) (local $c i32)
    block $differ
      loop $next
        local.get $a
        local.get $i
        i32.add
        i32.load8_u
        local.tee $c
        local.get $b
        local.get $i
        i32.add
        i32.load8_u
        i32.ne
        br_if $differ
        local.get $c
        i32.eqz
        if
          i32.const 1
          return
        end
        local.get $i
        i32.const 1
        i32.add
        local.set $i
        br $next
      end
    end
    i32.const 0
  )"#;

const STRING_CONCAT: &str = r#"  (func $rt.string_concat (param $a i32) (param $b i32) (result i32)
    (local $len_a i32) (local $len_b i32) (local $ptr i32)
    local.get $a
    call $rt.string_len
    local.set $len_a
    local.get $b
    call $rt.string_len
    local.set $len_b
    local.get $len_a
    local.get $len_b
    i32.add
    i32.const 1
    i32.add
    call $rt.alloc
    local.set $ptr
    local.get $ptr
    local.get $a
    local.get $len_a
    memory.copy
    local.get $ptr
    local.get $len_a
    i32.add
    local.get $b
    local.get $len_b
    memory.copy
    local.get $ptr
    local.get $len_a
    i32.add
    local.get $len_b
    i32.add
    i32.const 0
    i32.store8
    local.get $ptr
  )"#;

/// Negative counts repeat zero times.
const STRING_REPEAT: &str = r#"  (func $rt.string_repeat (param $src i32) (param $count f64) (result i32)
    (local $len i32) (local $times i32) (local $ptr i32) (local $i i32)
    local.get $src
    call $rt.string_len
    local.set $len
    local.get $count
    i32.trunc_sat_f64_s
    local.tee $times
    i32.const 0
    i32.lt_s
    if
      i32.const 0
      local.set $times
    end
    local.get $len
    local.get $times
    i32.mul
    i32.const 1
    i32.add
    call $rt.alloc
    local.set $ptr
    block $done
      loop $copy
        local.get $i
        local.get $times
        i32.ge_u
        br_if $done
        local.get $ptr
        local.get $i
        local.get $len
        i32.mul
        i32.add
        local.get $src
        local.get $len
        memory.copy
        local.get $i
        i32.const 1
        i32.add
        local.set $i
        br $copy
      end
    end
    local.get $ptr
    local.get $len
    local.get $times
    i32.mul
    i32.add
    i32.const 0
    i32.store8
    local.get $ptr
  )"#;

const LIST_LEN: &str = r#"  (func $rt.list_len (param $list i32) (result i32)
    local.get $list
    i32.load
  )"#;

/// Removes and returns the first element. An empty list yields 0.
const LIST_DEQUEUE: &str = r#"  (func $rt.list_dequeue (param $list i32) (result f64)
    (local $len i32) (local $first f64)
    local.get $list
    i32.load
    local.tee $len
    i32.eqz
    if
      f64.const 0
      return
    end
    local.get $list
    f64.load offset=12
    local.set $first
    local.get $list
    i32.const 12
    i32.add
    local.get $list
    i32.const 20
    i32.add
    local.get $len
    i32.const 1
    i32.sub
    i32.const 8
    i32.mul
    memory.copy
    local.get $list
    local.get $len
    i32.const 1
    i32.sub
    i32.store
    local.get $first
  )"#;

/// Appends in place, or moves the list to a block of twice the capacity
/// (at least 4) when it is full. The null list starts a fresh one.
const LIST_APPEND: &str = r#"  (func $rt.list_append (param $list i32) (param $value f64) (result i32)
    (local $len i32) (local $size i32) (local $cap i32) (local $new i32)
    local.get $list
    if
      local.get $list
      i32.load
      local.set $len
      local.get $list
      i32.load offset=4
      local.set $size
      local.get $list
      i32.load offset=8
      local.set $cap
    end
    local.get $size
    i32.eqz
    if
      i32.const 8
      local.set $size
    end
    local.get $len
    local.get $cap
    i32.ge_u
    if
      local.get $cap
      i32.const 2
      i32.mul
      local.tee $cap
      i32.const 4
      i32.lt_u
      if
        i32.const 4
        local.set $cap
      end
      i32.const 12
      local.get $cap
      local.get $size
      i32.mul
      i32.add
      call $rt.alloc
      local.set $new
      local.get $list
      if
        local.get $new
        local.get $list
        i32.const 12
        local.get $len
        local.get $size
        i32.mul
        i32.add
        memory.copy
      end
      local.get $new
      local.get $cap
      i32.store offset=8
      local.get $new
      local.get $size
      i32.store offset=4
      local.get $new
      local.set $list
    end
    local.get $list
    i32.const 12
    i32.add
    local.get $len
    local.get $size
    i32.mul
    i32.add
    local.get $value
    f64.store
    local.get $list
    local.get $len
    i32.const 1
    i32.add
    i32.store
    local.get $list
  )"#;

/// A value that survives `f64 -> u32 -> f64` is taken to be an address.
const COERCE_STRING: &str = r#"  (func $rt.coerce_string (param $value f64) (result i32)
    local.get $value
    local.get $value
    i32.trunc_sat_f64_u
    f64.convert_i32_u
    f64.eq
    if (result i32)
      local.get $value
      i32.trunc_sat_f64_u
    else
      local.get $value
      call $env.f64_to_string
    end
  )"#;

const WRITE_STRING: &str = r#"  (func $rt.write_string (param $ptr i32)
    (local $c i32)
    block $done
      loop $next
        local.get $ptr
        i32.load8_u
        local.tee $c
        i32.eqz
        br_if $done
        local.get $c
        call $env.write_char
        local.get $ptr
        i32.const 1
        i32.add
        local.set $ptr
        br $next
      end
    end
  )"#;

/// Prints `[a, b, c]`.
const WRITE_LIST: &str = r#"  (func $rt.write_list (param $list i32)
    (local $len i32) (local $i i32)
    local.get $list
    i32.load
    local.set $len
    i32.const 91
    call $env.write_char
    block $done
      loop $next
        local.get $i
        local.get $len
        i32.ge_u
        br_if $done
        local.get $i
        if
          i32.const 44
          call $env.write_char
          i32.const 32
          call $env.write_char
        end
        local.get $list
        i32.const 12
        i32.add
        local.get $i
        i32.const 8
        i32.mul
        i32.add
        f64.load
        call $env.write_num
        local.get $i
        i32.const 1
        i32.add
        local.set $i
        br $next
      end
    end
    i32.const 93
    call $env.write_char
  )"#;

/// Every runtime function, in emission order.
pub const RUNTIME_FUNCTIONS: [&str; 11] = [
    ALLOC,
    STRING_LEN,
    STRING_EQ,
    STRING_CONCAT,
    STRING_REPEAT,
    LIST_LEN,
    LIST_DEQUEUE,
    LIST_APPEND,
    COERCE_STRING,
    WRITE_STRING,
    WRITE_LIST,
];

/// Encodes bytes as a data string: printable ASCII stays as is, everything
/// else (including `"` and `\`) becomes a `\xx` escape. A `\00` terminator
/// is appended.
pub fn escape_data(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 3);

    for byte in value.bytes() {
        match byte {
            b'"' | b'\\' => escaped.push_str(&format!("\\{:02x}", byte)),
            0x20..=0x7e => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\{:02x}", byte)),
        }
    }

    escaped.push_str("\\00");
    escaped
}

/// Byte size of a list literal with `len` elements.
pub fn list_allocation_size(len: u32) -> u32 {
    LIST_HEADER_SIZE + len.max(LIST_MIN_CAPACITY) * LIST_ELEMENT_SIZE
}
