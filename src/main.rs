use hec_asm::{translate_kernel, IsaSpec, Opcode, VariableTable};

// The ASM-ISA token counts of the opcodes used below, as the ISA configuration would set them.
const ISA_CONFIG: &str = r#"{
  "policy": "warn",
  "entries": {
    "copy": { "num_tokens": 6, "default_throughput": 1, "default_latency": 6 },
    "sub":  { "num_tokens": 7, "default_throughput": 1, "default_latency": 6 },
    "add":  { "num_tokens": 7, "default_throughput": 1, "default_latency": 6 }
  }
}"#;

fn main() {

  let text = "
13, add, t_0 (1), a_0 (0), b_0 (2), 0
13, sub, t_1 (2), t_0 (1), c_0 (0), 0     # t_1 = a + b - c
13, copy, output_0_1_3 (2), t_1 (2), 0

  # done
";

  let isa = match IsaSpec::from_json(ISA_CONFIG) {
    Ok(isa) => isa,
    Err(e) => {
      eprintln!("Error: {}", e);
      return;
    }
  };
  println!("{}", isa);
  println!("Kernel:{}", text);

  let mut variables = VariableTable::new();
  match translate_kernel(&isa, &mut variables, text) {
    Ok(translation) => {
      for line in translation.lines.iter() {
        println!("{}", line);
      }
      for (line, warning) in translation.warnings.iter() {
        println!("line {}: {}", line, warning);
      }
      println!("Variables: {}", variables.len());
    }
    Err(e) => {
      eprintln!("Error: {}", e);
    }
  }

  if let Ok(entry) = isa.describe(Opcode::Copy) {
    println!("copy -> {}: {:?}", Opcode::Copy.asm_name(), entry);
  }
}
