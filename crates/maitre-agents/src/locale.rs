//! Guest-facing fixed strings, keyed by language
//!
//! Every table is plain data; adding a language means adding a table.
//! Missing keys fall back to English. Placeholders use `{name}` syntax and
//! are filled by [`render`].

use maitre_common::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Text {
    Apology,
    ValidationHint,
    NameClarifyFirst,
    NameClarifySecond,
    NameClarifyFinal,
    NameConfirmed,
    NameFallback,
    AskIdentity,
    ReservationsHeader,
    WhatToChange,
    WhichReservation,
    NoopModification,
    NoReservationsFound,
    Guests,
    AskOriginalRequest,
    AlternativesIntro,
    AlternativesQuestion,
    NoAlternatives,
    JustIntimate,
    JustPrime,
    JustLate,
    JustClosest,
    ThanksReply,
    HandoffBooking,
    HandoffReservations,
}

type Table = &'static [(Text, &'static str)];

const EN: Table = &[
    (Text::Apology, "I'm sorry, something went wrong on my side. Could you please repeat that?"),
    (Text::ValidationHint, "Could you check that detail once more? For example: {example}"),
    (Text::NameClarifyFirst, "I see you've booked with us before as {db_name}. Should I make this reservation under {request_name} instead?"),
    (Text::NameClarifySecond, "Just to be sure: should I book under \"{db_name}\" or \"{request_name}\"? Please reply with one of the two names."),
    (Text::NameClarifyFinal, "Please type exactly one name: {db_name} or {request_name}."),
    (Text::NameConfirmed, "Thank you! I'll make the reservation under {name}."),
    (Text::NameFallback, "No problem, I'll make the reservation under {name}."),
    (Text::AskIdentity, "Could you tell me the name or phone number the reservation was made under?"),
    (Text::ReservationsHeader, "Here are your reservations:"),
    (Text::WhatToChange, "What would you like to change: the date, the time or the number of guests?"),
    (Text::WhichReservation, "Which reservation would you like to change? Please tell me its number."),
    (Text::NoopModification, "Reservation #{id} is already set for {date} at {time} for {guests} guests. What would you like to change?"),
    (Text::NoReservationsFound, "I couldn't find any upcoming reservations. Could you double-check the name or phone number?"),
    (Text::Guests, "guests"),
    (Text::AskOriginalRequest, "Could you tell me the date, time and number of guests you were hoping for? Then I'll find the best alternatives."),
    (Text::AlternativesIntro, "{time} on {date} is fully booked, but these times are available:"),
    (Text::AlternativesQuestion, "Which one would you prefer?"),
    (Text::NoAlternatives, "I'm sorry, I couldn't find a free table near {time} on {date}. Would another day work for you?"),
    (Text::JustIntimate, "quieter, more intimate"),
    (Text::JustPrime, "popular dinner time"),
    (Text::JustLate, "relaxed late dining"),
    (Text::JustClosest, "closest to your original time"),
    (Text::ThanksReply, "You're very welcome! Is there anything else I can help you with?"),
    (Text::HandoffBooking, "Of course! Let me help you with a new reservation."),
    (Text::HandoffReservations, "Sure, let me look up your reservation."),
];

const RU: Table = &[
    (Text::Apology, "Извините, у меня что-то пошло не так. Не могли бы вы повторить?"),
    (Text::ValidationHint, "Проверьте, пожалуйста, эту деталь ещё раз. Например: {example}"),
    (Text::NameClarifyFirst, "Вижу, что раньше вы бронировали у нас как {db_name}. Оформить эту бронь на имя {request_name}?"),
    (Text::NameClarifySecond, "Уточню: бронировать на «{db_name}» или на «{request_name}»? Пожалуйста, ответьте одним из двух имён."),
    (Text::NameClarifyFinal, "Пожалуйста, напишите ровно одно имя: {db_name} или {request_name}."),
    (Text::NameConfirmed, "Спасибо! Оформляю бронь на имя {name}."),
    (Text::NameFallback, "Хорошо, оформляю бронь на имя {name}."),
    (Text::AskIdentity, "Подскажите, пожалуйста, на какое имя или номер телефона сделана бронь?"),
    (Text::ReservationsHeader, "Ваши бронирования:"),
    (Text::WhatToChange, "Что вы хотите изменить: дату, время или количество гостей?"),
    (Text::WhichReservation, "Какое бронирование вы хотите изменить? Назовите, пожалуйста, его номер."),
    (Text::NoopModification, "Бронь #{id} уже на {date} в {time} на {guests} гостей. Что именно вы хотите изменить?"),
    (Text::NoReservationsFound, "Я не нашла предстоящих бронирований. Проверьте, пожалуйста, имя или номер телефона."),
    (Text::Guests, "гостей"),
    (Text::AskOriginalRequest, "Подскажите, на какую дату, время и сколько гостей вы хотели забронировать? Тогда я подберу лучшие варианты."),
    (Text::AlternativesIntro, "На {date} в {time} всё занято, но есть такие варианты:"),
    (Text::AlternativesQuestion, "Какой вариант вам больше подходит?"),
    (Text::NoAlternatives, "К сожалению, рядом с {time} на {date} свободных столиков нет. Может быть, подойдёт другой день?"),
    (Text::JustIntimate, "тише и уютнее"),
    (Text::JustPrime, "популярное время ужина"),
    (Text::JustLate, "неспешный поздний ужин"),
    (Text::JustClosest, "ближе всего к вашему времени"),
    (Text::ThanksReply, "Пожалуйста! Могу ли я ещё чем-нибудь помочь?"),
    (Text::HandoffBooking, "Конечно! Давайте оформим новое бронирование."),
    (Text::HandoffReservations, "Конечно, сейчас найду ваше бронирование."),
];

const SR: Table = &[
    (Text::Apology, "Izvinite, nešto je pošlo po zlu. Možete li da ponovite?"),
    (Text::ValidationHint, "Da li biste mogli još jednom da proverite taj podatak? Na primer: {example}"),
    (Text::NameClarifyFirst, "Vidim da ste ranije rezervisali kao {db_name}. Da li da ovu rezervaciju napravim na ime {request_name}?"),
    (Text::NameClarifySecond, "Samo da proverim: da li rezervišem na ime \"{db_name}\" ili \"{request_name}\"? Odgovorite jednim od ta dva imena."),
    (Text::NameClarifyFinal, "Molim vas napišite tačno jedno ime: {db_name} ili {request_name}."),
    (Text::NameConfirmed, "Hvala! Rezervaciju pravim na ime {name}."),
    (Text::NameFallback, "U redu, rezervaciju pravim na ime {name}."),
    (Text::AskIdentity, "Na koje ime ili broj telefona je napravljena rezervacija?"),
    (Text::ReservationsHeader, "Vaše rezervacije:"),
    (Text::WhatToChange, "Šta biste želeli da promenite: datum, vreme ili broj gostiju?"),
    (Text::WhichReservation, "Koju rezervaciju želite da promenite? Recite mi njen broj."),
    (Text::NoopModification, "Rezervacija #{id} je već za {date} u {time} za {guests} gostiju. Šta biste želeli da promenite?"),
    (Text::NoReservationsFound, "Nisam pronašla nijednu predstojeću rezervaciju. Možete li da proverite ime ili broj telefona?"),
    (Text::Guests, "gostiju"),
    (Text::AskOriginalRequest, "Za koji datum, vreme i broj gostiju ste želeli rezervaciju? Onda ću pronaći najbolje alternative."),
    (Text::AlternativesIntro, "{date} u {time} je sve popunjeno, ali slobodni su ovi termini:"),
    (Text::AlternativesQuestion, "Koji vam najviše odgovara?"),
    (Text::NoAlternatives, "Nažalost, nema slobodnih stolova oko {time} za {date}. Da li vam odgovara neki drugi dan?"),
    (Text::JustIntimate, "mirnije i intimnije"),
    (Text::JustPrime, "popularno vreme za večeru"),
    (Text::JustLate, "opuštena kasna večera"),
    (Text::JustClosest, "najbliže vašem vremenu"),
    (Text::ThanksReply, "Nema na čemu! Mogu li još nešto da vam pomognem?"),
    (Text::HandoffBooking, "Naravno! Hajde da napravimo novu rezervaciju."),
    (Text::HandoffReservations, "Naravno, odmah pronalazim vašu rezervaciju."),
];

const HU: Table = &[
    (Text::Apology, "Elnézést, valami hiba történt nálam. Megismételné, kérem?"),
    (Text::NameClarifyFirst, "Látom, korábban {db_name} néven foglalt nálunk. Most {request_name} névre szóljon a foglalás?"),
    (Text::NameClarifyFinal, "Kérem, pontosan egy nevet írjon: {db_name} vagy {request_name}."),
    (Text::NameConfirmed, "Köszönöm! A foglalást {name} névre rögzítem."),
    (Text::AskIdentity, "Milyen névre vagy telefonszámra szól a foglalás?"),
    (Text::WhatToChange, "Mit szeretne módosítani: a dátumot, az időpontot vagy a vendégek számát?"),
    (Text::Guests, "fő"),
    (Text::AskOriginalRequest, "Milyen dátumra, időpontra és hány főre szeretett volna foglalni? Akkor megkeresem a legjobb alternatívákat."),
    (Text::JustIntimate, "csendesebb, meghittebb"),
    (Text::JustPrime, "népszerű vacsoraidő"),
    (Text::JustLate, "nyugodt késői vacsora"),
    (Text::JustClosest, "legközelebb az eredeti időponthoz"),
    (Text::ThanksReply, "Szívesen! Segíthetek még valamiben?"),
];

const DE: Table = &[
    (Text::Apology, "Entschuldigung, bei mir ist etwas schiefgelaufen. Könnten Sie das bitte wiederholen?"),
    (Text::ValidationHint, "Könnten Sie diese Angabe bitte noch einmal prüfen? Zum Beispiel: {example}"),
    (Text::NameClarifyFirst, "Ich sehe, dass Sie schon einmal als {db_name} bei uns gebucht haben. Soll ich diese Reservierung stattdessen auf {request_name} anlegen?"),
    (Text::NameClarifySecond, "Nur zur Sicherheit: Soll ich auf \"{db_name}\" oder \"{request_name}\" buchen? Bitte antworten Sie mit einem der beiden Namen."),
    (Text::NameClarifyFinal, "Bitte schreiben Sie genau einen Namen: {db_name} oder {request_name}."),
    (Text::NameConfirmed, "Danke! Ich reserviere auf den Namen {name}."),
    (Text::NameFallback, "In Ordnung, ich reserviere auf den Namen {name}."),
    (Text::AskIdentity, "Auf welchen Namen oder welche Telefonnummer läuft die Reservierung?"),
    (Text::ReservationsHeader, "Hier sind Ihre Reservierungen:"),
    (Text::WhatToChange, "Was möchten Sie ändern: das Datum, die Uhrzeit oder die Anzahl der Gäste?"),
    (Text::WhichReservation, "Welche Reservierung möchten Sie ändern? Bitte nennen Sie mir die Nummer."),
    (Text::NoopModification, "Reservierung #{id} ist bereits für {date} um {time} für {guests} Gäste eingetragen. Was möchten Sie ändern?"),
    (Text::NoReservationsFound, "Ich konnte keine anstehenden Reservierungen finden. Könnten Sie Namen oder Telefonnummer prüfen?"),
    (Text::Guests, "Gäste"),
    (Text::AskOriginalRequest, "Für welches Datum, welche Uhrzeit und wie viele Gäste wollten Sie reservieren? Dann suche ich die besten Alternativen."),
    (Text::AlternativesIntro, "{date} um {time} ist ausgebucht, aber diese Zeiten sind frei:"),
    (Text::AlternativesQuestion, "Welche Zeit passt Ihnen am besten?"),
    (Text::NoAlternatives, "Leider ist um {time} am {date} nichts frei. Würde Ihnen ein anderer Tag passen?"),
    (Text::JustIntimate, "ruhiger, intimer"),
    (Text::JustPrime, "beliebte Abendessenszeit"),
    (Text::JustLate, "entspanntes spätes Essen"),
    (Text::JustClosest, "am nächsten an Ihrer Wunschzeit"),
    (Text::ThanksReply, "Sehr gern! Kann ich sonst noch etwas für Sie tun?"),
    (Text::HandoffBooking, "Natürlich! Lassen Sie uns eine neue Reservierung anlegen."),
    (Text::HandoffReservations, "Gern, ich suche Ihre Reservierung heraus."),
];

const FR: Table = &[
    (Text::Apology, "Désolée, un problème est survenu de mon côté. Pourriez-vous répéter ?"),
    (Text::NameClarifyFirst, "Je vois que vous avez déjà réservé chez nous sous le nom {db_name}. Dois-je faire cette réservation au nom de {request_name} ?"),
    (Text::NameClarifyFinal, "Merci d'écrire un seul nom : {db_name} ou {request_name}."),
    (Text::NameConfirmed, "Merci ! Je fais la réservation au nom de {name}."),
    (Text::AskIdentity, "À quel nom ou numéro de téléphone la réservation a-t-elle été faite ?"),
    (Text::WhatToChange, "Que souhaitez-vous modifier : la date, l'heure ou le nombre de personnes ?"),
    (Text::Guests, "personnes"),
    (Text::AskOriginalRequest, "Pour quelle date, quelle heure et combien de personnes souhaitiez-vous réserver ? Je trouverai ensuite les meilleures alternatives."),
    (Text::JustIntimate, "plus calme, plus intime"),
    (Text::JustPrime, "heure de dîner prisée"),
    (Text::JustLate, "dîner tardif et détendu"),
    (Text::JustClosest, "le plus proche de l'heure souhaitée"),
    (Text::ThanksReply, "Avec plaisir ! Puis-je vous aider pour autre chose ?"),
];

const ES: Table = &[
    (Text::Apology, "Lo siento, algo salió mal por mi parte. ¿Podría repetirlo?"),
    (Text::NameClarifyFirst, "Veo que antes reservó con nosotros como {db_name}. ¿Hago esta reserva a nombre de {request_name}?"),
    (Text::NameClarifyFinal, "Por favor, escriba un solo nombre: {db_name} o {request_name}."),
    (Text::NameConfirmed, "¡Gracias! Hago la reserva a nombre de {name}."),
    (Text::AskIdentity, "¿A qué nombre o número de teléfono está la reserva?"),
    (Text::WhatToChange, "¿Qué le gustaría cambiar: la fecha, la hora o el número de personas?"),
    (Text::Guests, "personas"),
    (Text::AskOriginalRequest, "¿Para qué fecha, hora y cuántas personas quería reservar? Así buscaré las mejores alternativas."),
    (Text::JustIntimate, "más tranquilo e íntimo"),
    (Text::JustPrime, "hora popular para cenar"),
    (Text::JustLate, "cena tardía y relajada"),
    (Text::JustClosest, "lo más cercano a su hora original"),
    (Text::ThanksReply, "¡De nada! ¿Puedo ayudarle con algo más?"),
];

const IT: Table = &[
    (Text::Apology, "Mi dispiace, qualcosa è andato storto. Potrebbe ripetere?"),
    (Text::NameClarifyFirst, "Vedo che ha già prenotato da noi come {db_name}. Faccio questa prenotazione a nome di {request_name}?"),
    (Text::NameClarifyFinal, "Per favore scriva un solo nome: {db_name} o {request_name}."),
    (Text::NameConfirmed, "Grazie! Faccio la prenotazione a nome di {name}."),
    (Text::AskIdentity, "A quale nome o numero di telefono è stata fatta la prenotazione?"),
    (Text::WhatToChange, "Cosa desidera modificare: la data, l'orario o il numero di persone?"),
    (Text::Guests, "persone"),
    (Text::AskOriginalRequest, "Per quale data, orario e quante persone desiderava prenotare? Così troverò le migliori alternative."),
    (Text::JustIntimate, "più tranquillo e intimo"),
    (Text::JustPrime, "orario di cena più richiesto"),
    (Text::JustLate, "cena tardiva e rilassata"),
    (Text::JustClosest, "il più vicino all'orario richiesto"),
    (Text::ThanksReply, "Prego! Posso aiutarla con qualcos'altro?"),
];

const PT: Table = &[
    (Text::Apology, "Desculpe, algo deu errado do meu lado. Poderia repetir?"),
    (Text::NameClarifyFirst, "Vejo que já reservou conosco como {db_name}. Faço esta reserva em nome de {request_name}?"),
    (Text::NameClarifyFinal, "Por favor, escreva apenas um nome: {db_name} ou {request_name}."),
    (Text::NameConfirmed, "Obrigada! Vou fazer a reserva em nome de {name}."),
    (Text::AskIdentity, "Em que nome ou número de telefone foi feita a reserva?"),
    (Text::WhatToChange, "O que gostaria de alterar: a data, o horário ou o número de pessoas?"),
    (Text::Guests, "pessoas"),
    (Text::AskOriginalRequest, "Para que data, horário e quantas pessoas queria reservar? Assim encontro as melhores alternativas."),
    (Text::JustIntimate, "mais tranquilo e íntimo"),
    (Text::JustPrime, "horário de jantar popular"),
    (Text::JustLate, "jantar tardio e descontraído"),
    (Text::JustClosest, "o mais próximo do horário original"),
    (Text::ThanksReply, "De nada! Posso ajudar em mais alguma coisa?"),
];

const NL: Table = &[
    (Text::Apology, "Sorry, er ging iets mis aan mijn kant. Kunt u dat herhalen?"),
    (Text::NameClarifyFirst, "Ik zie dat u eerder bij ons reserveerde als {db_name}. Zal ik deze reservering op naam van {request_name} zetten?"),
    (Text::NameClarifyFinal, "Typ alstublieft precies één naam: {db_name} of {request_name}."),
    (Text::NameConfirmed, "Dank u! Ik maak de reservering op naam van {name}."),
    (Text::AskIdentity, "Op welke naam of welk telefoonnummer staat de reservering?"),
    (Text::WhatToChange, "Wat wilt u wijzigen: de datum, de tijd of het aantal gasten?"),
    (Text::Guests, "gasten"),
    (Text::AskOriginalRequest, "Voor welke datum, tijd en hoeveel gasten wilde u reserveren? Dan zoek ik de beste alternatieven."),
    (Text::JustIntimate, "rustiger, intiemer"),
    (Text::JustPrime, "populaire dinertijd"),
    (Text::JustLate, "ontspannen laat dineren"),
    (Text::JustClosest, "het dichtst bij uw oorspronkelijke tijd"),
    (Text::ThanksReply, "Graag gedaan! Kan ik u nog ergens mee helpen?"),
];

const TABLES: &[(Language, Table)] = &[
    (Language::En, EN),
    (Language::Ru, RU),
    (Language::Sr, SR),
    (Language::Hu, HU),
    (Language::De, DE),
    (Language::Fr, FR),
    (Language::Es, ES),
    (Language::It, IT),
    (Language::Pt, PT),
    (Language::Nl, NL),
];

fn lookup(language: Language, key: Text) -> Option<&'static str> {
    TABLES
        .iter()
        .find(|(lang, _)| *lang == language)
        .and_then(|(_, table)| table.iter().find(|(k, _)| *k == key))
        .map(|(_, value)| *value)
}

/// Fixed string for `key`, falling back to English
pub fn text(language: Language, key: Text) -> &'static str {
    lookup(language, key)
        .or_else(|| lookup(Language::En, key))
        .unwrap_or_default()
}

/// Fixed string with `{placeholder}` values filled in
pub fn render(language: Language, key: Text, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(text(language, key).to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{}}}", name), value)
        })
}
