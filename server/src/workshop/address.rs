use crate::model::enums::TipoCliente;

const NO_ADDRESS: &str = "Sin dirección registrada";

/// Postal address fields shared by clients and branches.
#[derive(Default)]
pub struct Address<'a> {
    pub calle: Option<&'a str>,
    pub numero_exterior: Option<&'a str>,
    pub numero_interior: Option<&'a str>,
    pub colonia: Option<&'a str>,
    pub codigo_postal: Option<&'a str>,
    pub ciudad: Option<&'a str>,
    pub estado: Option<&'a str>,
}

impl Address<'_> {
    /// Formats as `calle #ext Int. int, Col. colonia, C.P. cp, ciudad, estado`,
    /// skipping missing parts. Street numbers are only shown alongside a street.
    pub fn full(&self) -> String {
        let mut parts = Vec::new();
        if let Some(calle) = non_blank(self.calle) {
            let mut street = calle.to_owned();
            if let Some(exterior) = non_blank(self.numero_exterior) {
                street.push_str(&format!(" #{exterior}"));
            }
            if let Some(interior) = non_blank(self.numero_interior) {
                street.push_str(&format!(" Int. {interior}"));
            }
            parts.push(street);
        }
        if let Some(colonia) = non_blank(self.colonia) {
            parts.push(format!("Col. {colonia}"));
        }
        if let Some(codigo_postal) = non_blank(self.codigo_postal) {
            parts.push(format!("C.P. {codigo_postal}"));
        }
        parts.extend(non_blank(self.ciudad).map(str::to_owned));
        parts.extend(non_blank(self.estado).map(str::to_owned));

        if parts.is_empty() {
            String::from(NO_ADDRESS)
        } else {
            parts.join(", ")
        }
    }
}

/// Display name of a client. Companies are shown by their legal name,
/// individuals by their given name followed by their surnames.
pub fn client_name(
    tipo_cliente: TipoCliente,
    nombre: &str,
    apellido_paterno: Option<&str>,
    apellido_materno: Option<&str>,
    razon_social: Option<&str>,
) -> String {
    if tipo_cliente == TipoCliente::PersonaMoral
        && let Some(razon_social) = non_blank(razon_social)
    {
        return razon_social.to_owned();
    }

    std::iter::once(nombre)
        .chain(non_blank(apellido_paterno))
        .chain(non_blank(apellido_materno))
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn full_address() {
        let address = Address {
            calle: Some("Av. Juárez"),
            numero_exterior: Some("120"),
            numero_interior: Some("3B"),
            colonia: Some("Centro"),
            codigo_postal: Some("06000"),
            ciudad: Some("CDMX"),
            estado: Some("Ciudad de México"),
        };
        assert_eq!(address.full(), "Av. Juárez #120 Int. 3B, Col. Centro, C.P. 06000, CDMX, Ciudad de México");
    }

    #[test]
    fn partial_address() {
        let address = Address {
            numero_exterior: Some("120"),
            colonia: Some("Centro"),
            ciudad: Some(" "),
            estado: Some("Jalisco"),
            ..Default::default()
        };
        assert_eq!(address.full(), "Col. Centro, Jalisco");
        assert_eq!(Address::default().full(), "Sin dirección registrada");
    }

    #[test]
    fn names() {
        let name = client_name(TipoCliente::PersonaFisica, "Ana", Some("López"), None, Some("ACME"));
        assert_eq!(name, "Ana López");
        let name = client_name(TipoCliente::PersonaFisica, "Ana", Some("López"), Some("Ruiz"), None);
        assert_eq!(name, "Ana López Ruiz");
        let name = client_name(TipoCliente::PersonaMoral, "Contacto", None, None, Some("Transportes del Norte SA"));
        assert_eq!(name, "Transportes del Norte SA");
        let name = client_name(TipoCliente::PersonaMoral, "Contacto", Some("Pérez"), None, None);
        assert_eq!(name, "Contacto Pérez");
    }
}
